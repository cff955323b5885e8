use shared::domain::Role;

use crate::store::Action;

pub fn set_active_role(role: Role) -> Action {
    Action::SetActiveRole(role)
}
