use super::principal::{EnrichedMember, Principal};

/// Which listing a page request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Channel,
    User,
    Domain,
    Member,
    Role,
}

/// Query field a free-text search term is sent in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Username,
    RoleName,
    Name,
}

impl EntityKind {
    pub fn search_field(self) -> SearchField {
        match self {
            Self::User | Self::Member => SearchField::Username,
            Self::Role => SearchField::RoleName,
            Self::Channel | Self::Domain => SearchField::Name,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::User => "user",
            Self::Domain => "domain",
            Self::Member => "member",
            Self::Role => "role",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub route: Option<String>,
}

/// Creator or last editor of a record. Listings carry the bare id; page
/// resolution swaps in the principal when it can be looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Id(String),
    Principal(Principal),
}

impl Actor {
    /// Username once resolved, the bare id otherwise.
    pub fn label(&self) -> &str {
        match self {
            Self::Id(id) => id,
            Self::Principal(principal) => &principal.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub created_by: Option<Actor>,
    pub updated_by: Option<Actor>,
}

impl Role {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }
}

/// One item of a resolved page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Channel(Channel),
    User(Principal),
    Domain(Domain),
    Role(Role),
    /// Workspace or channel member with the roles it holds.
    Member(EnrichedMember),
    /// Holder of a single role; the role itself is implied by the query.
    RoleMember(Principal),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Self::Channel(channel) => &channel.id,
            Self::User(principal) | Self::RoleMember(principal) => &principal.id,
            Self::Domain(domain) => &domain.id,
            Self::Role(role) => &role.id,
            Self::Member(member) => &member.principal.id,
        }
    }

    /// Human label for pickers: the username for people, the name otherwise,
    /// falling back to the id when that is blank.
    pub fn display_label(&self) -> &str {
        let label = match self {
            Self::User(principal) | Self::RoleMember(principal) => &principal.username,
            Self::Member(member) => &member.principal.username,
            Self::Channel(channel) => &channel.name,
            Self::Domain(domain) => &domain.name,
            Self::Role(role) => &role.name,
        };

        if label.is_empty() {
            self.id()
        } else {
            label
        }
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            Self::User(principal) | Self::RoleMember(principal) => Some(principal),
            Self::Member(member) => Some(&member.principal),
            _ => None,
        }
    }
}
