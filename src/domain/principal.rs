/// Account state as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Enabled,
    Disabled,
}

/// Status predicate carried by page queries. `All` disables the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    Enabled,
    #[cfg_attr(not(test), allow(dead_code))]
    Disabled,
    #[default]
    All,
}

impl StatusFilter {
    pub fn matches(self, status: Status) -> bool {
        match self {
            Self::All => true,
            Self::Enabled => status == Status::Enabled,
            Self::Disabled => status == Status::Disabled,
        }
    }
}

/// A user-like identity. Only `id` is stable; the platform owns every other field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Principal {
    pub id: String,
    pub username: String,
    pub status: Status,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl Principal {
    pub fn new(id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            ..Self::default()
        }
    }
}

/// Actions granted to a principal through one role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleActions {
    pub role_id: String,
    pub role_name: String,
    pub actions: Vec<String>,
}

/// Raw association of a principal with a channel or workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub member_id: String,
    pub roles: Vec<RoleActions>,
}

/// A resolved principal merged with the roles its membership grants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedMember {
    pub principal: Principal,
    pub roles: Vec<RoleActions>,
}

impl EnrichedMember {
    pub fn new(principal: Principal, roles: Vec<RoleActions>) -> Self {
        Self { principal, roles }
    }

    pub fn has_action(&self, action: &str) -> bool {
        self.roles
            .iter()
            .any(|role| role.actions.iter().any(|granted| granted == action))
    }
}
