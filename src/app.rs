use std::time::Instant;

use anyhow::Result;
use chrono::DateTime;

use crate::{
    cli::{Cli, Command},
    domain::{
        self,
        entity::{Entity, EntityKind},
        message::Message,
        page::{Page, PageQuery},
        principal::StatusFilter,
        topic::canonical_topic,
    },
    infra::{self, error::AppError},
    platform::{
        self,
        fixtures::{DEMO_ALICE_ID, DEMO_BOB_ID, DEMO_CHANNEL_ID, DEMO_WORKSPACE_ID},
    },
    usecases::{
        self,
        bootstrap::{self, Bootstrap},
        channel_members::list_channel_members,
        context::{AppContext, LoopbackSession},
    },
};

const DEMO_FAILED: &str = "APP_DEMO_FAILED";

pub fn run(cli: Cli) -> Result<()> {
    match cli.command_or_default() {
        Command::Topic { a, b } => {
            println!("{}", canonical_topic(&a, &b));
        }
        Command::Demo => {
            let Bootstrap {
                context,
                log_guard: _log_guard,
            } = bootstrap::bootstrap(cli.config.as_deref())?;

            tracing::debug!(
                domain = domain::module_name(),
                platform = platform::module_name(),
                usecases = usecases::module_name(),
                infra = infra::module_name(),
                "module boundaries loaded"
            );

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(AppError::Runtime)?;

            match runtime.block_on(run_demo(&context)) {
                Ok(lines) => {
                    for line in lines {
                        println!("{line}");
                    }
                }
                Err(error) => {
                    tracing::error!(code = DEMO_FAILED, error = ?error, "demo run failed");
                    return Err(error);
                }
            }
        }
    }

    Ok(())
}

/// Two people chat on the demo channel, then the directory gets walked the
/// way the sidebar and the member picker walk it.
async fn run_demo(context: &AppContext) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    // Two clients on one broker: each user id holds its own container leases.
    let alice = context.messaging_session(DEMO_ALICE_ID);
    let bob = context.messaging_session(DEMO_BOB_ID);
    alice.connect(DEMO_WORKSPACE_ID, DEMO_CHANNEL_ID).await?;
    bob.connect(DEMO_WORKSPACE_ID, DEMO_CHANNEL_ID).await?;
    tracing::debug!(
        status = ?alice.connection_status(),
        channel_id = alice.channel_id().as_deref().unwrap_or_default(),
        "demo clients connected"
    );

    alice.send_message("hello everyone").await?;
    bob.drain_inbound();
    lines.push(format!("# broadcast seen by {DEMO_BOB_ID}"));
    push_buffer(&mut lines, &bob);

    let dm = canonical_topic(DEMO_ALICE_ID, DEMO_BOB_ID);
    alice.set_active_topic(Some(dm.clone())).await?;
    bob.set_active_topic(Some(dm.clone())).await?;
    bob.send_message("hi alice, this one is just for you").await?;
    alice.send_message("got it").await?;
    alice.drain_inbound();
    lines.push(format!("# direct messages on {dm} seen by {DEMO_ALICE_ID}"));
    push_buffer(&mut lines, &alice);

    bob.set_active_topic(None).await?;
    lines.push(format!("# {DEMO_BOB_ID} back on broadcast after reload"));
    push_buffer(&mut lines, &bob);

    alice.disconnect().await;
    bob.disconnect().await;

    let resolver = context.page_resolver();
    let members = list_channel_members(&resolver, DEMO_CHANNEL_ID).await;
    lines.push(format!("# members of {DEMO_CHANNEL_ID}"));
    push_page(&mut lines, &members);

    let mut active = PageQuery::new(0, 10).with_search(EntityKind::Member.search_field(), "a");
    active.status = StatusFilter::Enabled;
    let workspace = resolver
        .resolve(EntityKind::Member, active, Some(DEMO_WORKSPACE_ID))
        .await;
    lines.push(format!("# active members of {DEMO_WORKSPACE_ID} matching \"a\""));
    push_page(&mut lines, &workspace);

    let domains = resolver
        .resolve(EntityKind::Domain, PageQuery::new(0, 10), None)
        .await;
    lines.push("# workspaces".to_owned());
    push_page(&mut lines, &domains);

    let channels = resolver
        .resolve(EntityKind::Channel, PageQuery::new(0, 10), Some(DEMO_WORKSPACE_ID))
        .await;
    lines.push(format!("# channels in {DEMO_WORKSPACE_ID}"));
    push_page(&mut lines, &channels);

    let roles = resolver
        .resolve(EntityKind::Role, PageQuery::new(0, 10), Some(DEMO_CHANNEL_ID))
        .await;
    lines.push(format!("# roles in {DEMO_CHANNEL_ID}"));
    push_page(&mut lines, &roles);

    let mut channel_picker = context
        .selector(EntityKind::Channel, None, Some(DEMO_WORKSPACE_ID))
        .with_init_page(channels);
    if let Some(selection) = channel_picker.select(DEMO_CHANNEL_ID) {
        lines.push(format!("# opened #{} ({})", selection.label, selection.id));
    }

    let mut picker = context.selector(EntityKind::User, Some(DEMO_ALICE_ID), None);
    let mut fetches = 0;
    while picker.on_scroll_into_view().await.is_some() {
        fetches += 1;
    }
    lines.push(format!(
        "# user picker: {} of {} loaded in {fetches} pages, state {:?}",
        picker.state().accumulated().len(),
        picker.state().total(),
        picker.state().ui_state()
    ));

    let typed_at = Instant::now();
    picker.on_search_change("guest", typed_at);
    picker.on_search_change("guest0", typed_at);
    picker
        .poll_search(typed_at + context.selector_settings().search_debounce)
        .await;
    let labels: Vec<&str> = picker
        .state()
        .accumulated()
        .iter()
        .map(Entity::display_label)
        .collect();
    lines.push(format!(
        "# user picker after searching \"{}\": {}",
        picker.state().search_term(),
        labels.join(", ")
    ));

    if let Some(selection) = picker.select("u-guest-03") {
        lines.push(format!("# picked {} ({})", selection.label, selection.id));
    }

    picker.on_clear_selection().await;
    lines.push(format!(
        "# selection cleared, picker back to {} of {}",
        picker.state().accumulated().len(),
        picker.state().total()
    ));

    Ok(lines)
}

fn push_buffer(lines: &mut Vec<String>, session: &LoopbackSession) {
    let viewer = session.settings().user_id.as_str();
    lines.extend(
        session
            .buffer()
            .iter()
            .map(|message| render_message(message, viewer)),
    );
}

fn push_page(lines: &mut Vec<String>, page: &Page<Entity>) {
    if let Some(error) = &page.error {
        lines.push(format!("  error: {error}"));
        return;
    }

    lines.extend(page.items.iter().map(|entity| match entity {
        Entity::Member(member) => {
            let roles: Vec<&str> = member.roles.iter().map(|r| r.role_name.as_str()).collect();
            let manager = if member.has_action("manage") {
                " (manager)"
            } else {
                ""
            };
            format!("  {} [{}]{manager}", entity.display_label(), roles.join(", "))
        }
        Entity::Role(role) => {
            let actors: Vec<String> = [
                ("created by", &role.created_by),
                ("updated by", &role.updated_by),
            ]
            .into_iter()
            .filter_map(|(verb, actor)| {
                actor.as_ref().map(|actor| format!("{verb} {}", actor.label()))
            })
            .collect();
            if actors.is_empty() {
                format!("  {}", entity.display_label())
            } else {
                format!("  {} ({})", entity.display_label(), actors.join(", "))
            }
        }
        Entity::Domain(domain) => match &domain.route {
            Some(route) => format!("  {} (/{route})", entity.display_label()),
            None => format!("  {}", entity.display_label()),
        },
        _ => format!("  {}", entity.display_label()),
    }));
    lines.push(format!("  ({} of {})", page.items.len(), page.total));
}

fn render_message(message: &Message, viewer_id: &str) -> String {
    let at = DateTime::from_timestamp_millis(message.timestamp_ms())
        .map(|at| at.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_owned());
    let author = if message.is_from(viewer_id) {
        "me"
    } else {
        message.publisher_id.as_str()
    };

    format!("  {at} {author}: {}", message.value)
}
