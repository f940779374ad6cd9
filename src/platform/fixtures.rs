use crate::{
    domain::{
        entity::{Actor, Channel, Domain, Role},
        message::Message,
        principal::{Membership, Principal, RoleActions, Status},
        topic::{Topic, DEFAULT_BROADCAST_TOPIC},
    },
    usecases::contracts::FetchError,
};

use super::{broker::LoopbackBroker, directory::Directory};

pub const DEMO_WORKSPACE_ID: &str = "ws-demo";
pub const DEMO_CHANNEL_ID: &str = "ch-general";
pub const DEMO_CHAT_MEMBER_ROLE_ID: &str = "role-chat-member";
pub const DEMO_ALICE_ID: &str = "u-alice";
pub const DEMO_BOB_ID: &str = "u-bob";

const GUEST_COUNT: usize = 41;
/// Account that no longer exists in the directory.
const FORMER_ADMIN_ID: &str = "u-former-admin";
/// 2024-01-01T09:00:00Z
const WELCOME_AT_NANOS: i64 = 1_704_099_600_000_000_000;

/// Workspace with one channel, four named people and a tail of guests long
/// enough to need several pages.
pub fn demo_directory() -> Directory {
    let people = [
        person(DEMO_ALICE_ID, "alice", "Alice", "Liddell"),
        person(DEMO_BOB_ID, "bob", "Bob", "Builder"),
        person("u-carol", "carol", "Carol", "Danvers"),
        Principal {
            status: Status::Disabled,
            ..person("u-dave", "dave", "Dave", "Bowman")
        },
    ];

    let mut directory = Directory::new()
        .with_domain(Domain {
            id: DEMO_WORKSPACE_ID.to_owned(),
            name: "Demo Workspace".to_owned(),
            route: Some("demo".to_owned()),
        })
        .with_channel(
            DEMO_WORKSPACE_ID,
            Channel {
                id: DEMO_CHANNEL_ID.to_owned(),
                name: "general".to_owned(),
            },
        )
        .with_role(
            DEMO_CHANNEL_ID,
            Role {
                created_by: Some(Actor::Id(DEMO_ALICE_ID.to_owned())),
                updated_by: Some(Actor::Id(FORMER_ADMIN_ID.to_owned())),
                ..Role::new(DEMO_CHAT_MEMBER_ROLE_ID, "chat-member")
            },
        );

    for (index, principal) in people.into_iter().enumerate() {
        let actions = if index == 0 {
            vec!["read".to_owned(), "write".to_owned(), "manage".to_owned()]
        } else {
            vec!["read".to_owned(), "write".to_owned()]
        };
        directory = directory
            .with_membership(
                DEMO_WORKSPACE_ID,
                Membership {
                    member_id: principal.id.clone(),
                    roles: vec![RoleActions {
                        role_id: DEMO_CHAT_MEMBER_ROLE_ID.to_owned(),
                        role_name: "chat-member".to_owned(),
                        actions,
                    }],
                },
            )
            .with_role_holder(DEMO_CHAT_MEMBER_ROLE_ID, &principal.id)
            .with_user(principal);
    }

    for index in 1..=GUEST_COUNT {
        directory = directory.with_user(Principal::new(
            format!("u-guest-{index:02}"),
            format!("guest{index:02}"),
        ));
    }

    directory
}

/// Puts a pinned welcome post into the demo channel's broadcast history.
pub fn seed_demo_history(broker: &LoopbackBroker) -> Result<(), FetchError> {
    let welcome = Message::new(
        Topic::broadcast(DEFAULT_BROADCAST_TOPIC),
        "welcome to #general",
        WELCOME_AT_NANOS,
        "u-carol",
    );

    broker.seed_history(DEMO_CHANNEL_ID, &welcome)
}

fn person(id: &str, username: &str, first_name: &str, last_name: &str) -> Principal {
    Principal {
        first_name: Some(first_name.to_owned()),
        last_name: Some(last_name.to_owned()),
        email: Some(format!("{username}@example.com")),
        ..Principal::new(id, username)
    }
}
