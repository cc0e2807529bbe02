// Copyright 2025 Verdict (https://github.com/verdict-rs/verdict)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Construction-time errors for the data contract

use thiserror::Error;

/// Raised when a [`crate::TestCase`] is constructed without its mandatory
/// fields. Optional fields never produce this error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// `input` was omitted or is blank. A blank input counts as missing.
    #[error("test case field `input` is required and must be non-empty")]
    MissingInput,

    /// `actual_output` was omitted. The empty string is accepted: a model
    /// can legitimately produce empty output, but the field must be supplied.
    #[error("test case field `actual_output` is required")]
    MissingActualOutput,
}
