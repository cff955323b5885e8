use crate::store::{Action, ErrorCategory, ReportedError};

fn report(category: ErrorCategory, message: String) -> Action {
    Action::ReportError(ReportedError { category, message })
}

pub fn fetch_error(message: String) -> Action {
    report(ErrorCategory::Fetch, message)
}

pub fn upsert_error(message: String) -> Action {
    report(ErrorCategory::Upsert, message)
}

pub fn delete_error(message: String) -> Action {
    report(ErrorCategory::Delete, message)
}

pub fn clear_errors() -> Action {
    Action::ClearErrors
}
