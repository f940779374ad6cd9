use super::{
    entity::{Channel, Domain, EntityKind, Role, SearchField},
    principal::{Membership, Principal, StatusFilter},
};

/// One bounded, offset-addressed slice of a larger remote collection.
///
/// `total` is the server-reported collection size unless client-side filtering
/// dropped items from this page; then it counts this page's survivors only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub items: Vec<T>,
    pub error: Option<String>,
}

impl<T> Page<T> {
    pub fn new(total: usize, limit: usize, offset: usize, items: Vec<T>) -> Self {
        Self {
            total,
            limit,
            offset,
            items,
            error: None,
        }
    }

    /// Safe empty state paired with the failure message.
    pub fn failed(offset: usize, error: impl ToString) -> Self {
        Self {
            total: 0,
            limit: 0,
            offset,
            items: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// Slices an in-memory collection the way a paging backend would.
    pub fn from_collection(all: Vec<T>, offset: usize, limit: usize) -> Self {
        let total = all.len();
        let items = all.into_iter().skip(offset).take(limit).collect();

        Self::new(total, limit, offset, items)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn map_items<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            total: self.total,
            limit: self.limit,
            offset: self.offset,
            items: self.items.into_iter().map(f).collect(),
            error: self.error,
        }
    }
}

/// Paging window plus the optional filters a listing accepts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageQuery {
    pub offset: usize,
    pub limit: usize,
    pub status: StatusFilter,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub role_name: Option<String>,
}

impl PageQuery {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            ..Self::default()
        }
    }

    /// Puts `term` into the field a listing searches by. Blank terms clear it.
    pub fn with_search(mut self, field: SearchField, term: &str) -> Self {
        let value = (!term.is_empty()).then(|| term.to_owned());
        match field {
            SearchField::Username => self.username = value,
            SearchField::RoleName => self.role_name = value,
            SearchField::Name => self.name = value,
        }
        self
    }

    pub fn search_term(&self, field: SearchField) -> Option<&str> {
        match field {
            SearchField::Username => self.username.as_deref(),
            SearchField::RoleName => self.role_name.as_deref(),
            SearchField::Name => self.name.as_deref(),
        }
    }
}

/// What a raw page fetcher hands back before principals are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPage {
    Channels(Page<Channel>),
    Users(Page<Principal>),
    Domains(Page<Domain>),
    Roles(Page<Role>),
    /// Members of a workspace or channel with their granted role actions.
    Memberships(Page<Membership>),
    /// Bare principal ids holding one role.
    RoleMembers(Page<String>),
}

impl RawPage {
    pub fn shape(&self) -> &'static str {
        match self {
            Self::Channels(_) => "channels",
            Self::Users(_) => "users",
            Self::Domains(_) => "domains",
            Self::Roles(_) => "roles",
            Self::Memberships(_) => "memberships",
            Self::RoleMembers(_) => "role_members",
        }
    }

    pub fn fits(&self, kind: EntityKind) -> bool {
        matches!(
            (kind, self),
            (EntityKind::Channel, Self::Channels(_))
                | (EntityKind::User, Self::Users(_))
                | (EntityKind::Domain, Self::Domains(_))
                | (EntityKind::Role, Self::Roles(_))
                | (EntityKind::Member, Self::Memberships(_) | Self::RoleMembers(_))
        )
    }
}
