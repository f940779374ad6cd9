use crate::domain::principal::Principal;

pub fn principal(id: &str, username: &str) -> Principal {
    Principal::new(id, username)
}
