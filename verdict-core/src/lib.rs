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

//! Verdict Core
//!
//! The data contract shared by the Verdict evaluation harness:
//! construction-validated [`TestCase`] records and the result types
//! produced by evaluation runs. No IO, no orchestration.

pub mod error;
pub mod result;
pub mod test_case;

pub use error::ValidationError;
pub use result::{MetricResult, TestRunResult};
pub use test_case::{TestCase, TestCaseBuilder};
