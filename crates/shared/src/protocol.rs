//! Path grammar shared by the client dispatchers and the mock backend router.

use crate::domain::{AssignmentId, Role, SessionId};

pub fn sessions_route(role: Role) -> String {
    format!("/{role}/sessions")
}

pub fn sessions_delete_route(role: Role) -> String {
    format!("/{role}/sessions/delete")
}

pub fn session_positions_route(role: Role, session_id: SessionId) -> String {
    format!("/{role}/sessions/{session_id}/positions")
}

pub fn positions_route(role: Role) -> String {
    format!("/{role}/positions")
}

pub fn positions_delete_route(role: Role) -> String {
    format!("/{role}/positions/delete")
}

pub fn applicants_route(role: Role) -> String {
    format!("/{role}/applicants")
}

pub fn applicants_delete_route(role: Role) -> String {
    format!("/{role}/applicants/delete")
}

pub fn session_assignments_route(role: Role, session_id: SessionId) -> String {
    format!("/{role}/sessions/{session_id}/assignments")
}

pub fn assignment_route(role: Role, assignment_id: AssignmentId) -> String {
    format!("/{role}/assignments/{assignment_id}")
}

pub fn assignments_route(role: Role) -> String {
    format!("/{role}/assignments")
}

pub fn assignments_delete_route(role: Role) -> String {
    format!("/{role}/assignments/delete")
}

pub fn session_contract_templates_route(role: Role, session_id: SessionId) -> String {
    format!("/{role}/sessions/{session_id}/contract_templates")
}

pub fn contract_templates_route(role: Role) -> String {
    format!("/{role}/contract_templates")
}

pub fn contract_templates_delete_route(role: Role) -> String {
    format!("/{role}/contract_templates/delete")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_are_role_scoped() {
        assert_eq!(
            session_assignments_route(Role::Instructor, SessionId(4)),
            "/instructor/sessions/4/assignments"
        );
        assert_eq!(
            assignment_route(Role::Admin, AssignmentId(12)),
            "/admin/assignments/12"
        );
        assert_eq!(sessions_delete_route(Role::Ta), "/ta/sessions/delete");
    }
}
