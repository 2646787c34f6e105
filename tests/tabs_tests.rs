// Tests for tabs module in src/tabs.rs

mod common;

use std::rc::Rc;
use std::time::{Duration, Instant};

use common::fixtures::{controller, id, service, FakeView};
use ttth::controller::{Subscription, ViewController};
use ttth::registry::ServiceConfig;
use ttth::tabs::{AccessKey, TabId, TabManager, SETTINGS_TITLE};

fn manager_with(services: &[ServiceConfig]) -> TabManager<FakeView> {
    let mut tabs = TabManager::new();
    for config in services {
        let (controller, _log) = controller(config);
        tabs.add_tab(config, controller);
    }
    tabs
}

fn three() -> Vec<ServiceConfig> {
    vec![
        service("a_whatsapp", "whatsapp", true),
        service("b_telegram", "telegram", true),
        service("c_slack", "slack", true),
    ]
}

fn keys(tabs: &TabManager<FakeView>) -> Vec<(u32, String)> {
    tabs.access_keys()
        .into_iter()
        .map(|k| (k.key, k.service_id.to_string()))
        .collect()
}

// ============================================================================
// Add / Remove Tests
// ============================================================================

#[test]
fn test_new_manager_shows_settings() {
    let tabs: TabManager<FakeView> = TabManager::new();
    assert!(tabs.is_empty());
    assert_eq!(tabs.active(), &TabId::Settings);
    assert!(tabs.ui().default_view_options().is_empty());
}

#[test]
fn test_add_tab_is_hidden_and_selectable() {
    let config = service("a_whatsapp", "whatsapp", true);
    let (controller, log) = controller(&config);
    log.borrow_mut().visible = true;

    let mut tabs = TabManager::new();
    let keys = tabs.add_tab(&config, controller);

    assert_eq!(
        keys,
        vec![AccessKey {
            key: 1,
            service_id: config.id.clone()
        }]
    );
    assert!(!log.borrow().visible);
    assert!(tabs.contains(&config.id));
    assert_eq!(tabs.ui().default_view_options()[0].id, config.id);
    assert_eq!(tabs.ui().default_view_options()[0].name, "WhatsApp");
    // adding never steals focus
    assert_eq!(tabs.active(), &TabId::Settings);
}

#[test]
fn test_add_existing_tab_is_ignored() {
    let config = service("a_whatsapp", "whatsapp", true);
    let mut tabs = manager_with(std::slice::from_ref(&config));
    let (again, _log) = controller(&config);

    tabs.add_tab(&config, again);

    assert_eq!(tabs.len(), 1);
    assert_eq!(tabs.ui().default_view_options().len(), 1);
}

#[test]
fn test_add_remove_round_trip() {
    let services = three();
    let mut tabs = manager_with(&services[..2]);
    let before_ids = tabs.visible_ids();
    let before_keys = keys(&tabs);

    let (controller, _log) = controller(&services[2]);
    tabs.add_tab(&services[2], controller);
    assert_eq!(tabs.len(), 3);

    tabs.remove_tab(&services[2].id).unwrap();

    assert_eq!(tabs.visible_ids(), before_ids);
    assert_eq!(keys(&tabs), before_keys);
    assert_eq!(tabs.ui().default_view_options().len(), 2);
}

#[test]
fn test_access_keys_stay_dense() {
    let services = three();
    let mut tabs = manager_with(&services);
    assert_eq!(
        keys(&tabs),
        vec![
            (1, "a_whatsapp".to_string()),
            (2, "b_telegram".to_string()),
            (3, "c_slack".to_string()),
        ]
    );

    let renumbered = tabs.remove_tab(&id("a_whatsapp")).unwrap().1;
    let numbers: Vec<u32> = renumbered.iter().map(|k| k.key).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(renumbered[0].service_id, id("b_telegram"));
    assert_eq!(tabs.tab(&id("c_slack")).unwrap().access_key, Some(2));
}

#[test]
fn test_remove_detaches_before_returning_context() {
    let config = service("a_whatsapp", "whatsapp", true);
    let view = FakeView::new(&config.id);
    let log = view.log.clone();
    let subscription = Subscription::new();
    let controller = ViewController::new(
        &config,
        view,
        subscription.clone(),
        Duration::from_secs(5),
        Instant::now(),
    );

    let mut tabs = TabManager::new();
    tabs.add_tab(&config, controller);
    tabs.switch_to(&TabId::Service(config.id.clone()));
    assert!(log.borrow().visible);

    let (context, _keys) = tabs.remove_tab(&config.id).unwrap();

    assert!(!subscription.is_active());
    assert!(!log.borrow().visible);
    assert_eq!(context.service_id, config.id);
    assert!(tabs.remove_tab(&config.id).is_none());
}

#[test]
fn test_removing_active_tab_falls_back_to_settings() {
    let services = three();
    let mut tabs = manager_with(&services);
    tabs.switch_to(&TabId::Service(id("b_telegram")));

    tabs.remove_tab(&id("b_telegram"));

    assert_eq!(tabs.active(), &TabId::Settings);
}

#[test]
fn test_removing_other_tab_keeps_active() {
    let services = three();
    let mut tabs = manager_with(&services);
    tabs.switch_to(&TabId::Service(id("c_slack")));

    tabs.remove_tab(&id("a_whatsapp"));

    assert_eq!(tabs.active(), &TabId::Service(id("c_slack")));
}

#[test]
fn test_replace_tab_keeps_position_and_keys() {
    let services = three();
    let mut tabs = manager_with(&services);
    tabs.switch_to(&TabId::Service(id("a_whatsapp")));
    let old_log = tabs.tab(&id("a_whatsapp")).unwrap().controller().context().log.clone();

    let mut renamed = services[0].clone();
    renamed.name = "Chats".to_string();
    renamed.url = "https://web.whatsapp.com/beta".to_string();
    let (replacement, new_log) = controller(&renamed);
    let old = tabs.replace_tab(&renamed, replacement).unwrap();

    assert!(!old.log.borrow().visible);
    assert!(Rc::ptr_eq(&old.log, &old_log));
    assert!(new_log.borrow().visible);
    assert_eq!(
        tabs.visible_ids(),
        vec![id("a_whatsapp"), id("b_telegram"), id("c_slack")]
    );
    assert_eq!(
        keys(&tabs),
        vec![
            (1, "a_whatsapp".to_string()),
            (2, "b_telegram".to_string()),
            (3, "c_slack".to_string()),
        ]
    );
    assert_eq!(tabs.active(), &TabId::Service(id("a_whatsapp")));
    let tab = tabs.tab(&id("a_whatsapp")).unwrap();
    assert_eq!(tab.name, "Chats");
    assert_eq!(tab.url, "https://web.whatsapp.com/beta");
    assert_eq!(tabs.ui().default_view_options()[0].name, "Chats");
}

#[test]
fn test_replace_inactive_tab_stays_hidden() {
    let services = three();
    let mut tabs = manager_with(&services);
    let (replacement, new_log) = controller(&services[1]);
    new_log.borrow_mut().visible = true;

    assert!(tabs.replace_tab(&services[1], replacement).is_some());
    assert!(!new_log.borrow().visible);
    assert_eq!(tabs.active(), &TabId::Settings);
}

#[test]
fn test_replace_unknown_tab() {
    let mut tabs = manager_with(&three());
    let config = service("d_xing", "xing", true);
    let (replacement, _log) = controller(&config);

    assert!(tabs.replace_tab(&config, replacement).is_none());
    assert_eq!(tabs.len(), 3);
}

// ============================================================================
// Switching Tests
// ============================================================================

#[test]
fn test_switch_returns_title_and_toggles_visibility() {
    let a = service("a_whatsapp", "whatsapp", true);
    let b = service("b_telegram", "telegram", true);
    let (ca, log_a) = controller(&a);
    let (cb, log_b) = controller(&b);
    let mut tabs = TabManager::new();
    tabs.add_tab(&a, ca);
    tabs.add_tab(&b, cb);

    assert_eq!(
        tabs.switch_to(&TabId::Service(a.id.clone())),
        Some("WhatsApp".to_string())
    );
    assert!(log_a.borrow().visible);

    assert_eq!(
        tabs.switch_to(&TabId::Service(b.id.clone())),
        Some("Telegram".to_string())
    );
    assert!(!log_a.borrow().visible);
    assert!(log_b.borrow().visible);

    assert_eq!(tabs.switch_to(&TabId::Settings), Some(SETTINGS_TITLE.to_string()));
    assert!(!log_b.borrow().visible);
}

#[test]
fn test_switch_to_unknown_tab() {
    let mut tabs = manager_with(&three());
    tabs.switch_to(&TabId::Service(id("a_whatsapp")));

    assert_eq!(tabs.switch_to(&TabId::Service(id("z_xing"))), None);
    assert_eq!(tabs.active(), &TabId::Service(id("a_whatsapp")));
}

#[test]
fn test_next_and_previous_wrap() {
    let mut tabs = manager_with(&three());
    tabs.switch_to(&TabId::Service(id("c_slack")));
    assert_eq!(tabs.next(), Some(TabId::Service(id("a_whatsapp"))));

    tabs.switch_to(&TabId::Service(id("a_whatsapp")));
    assert_eq!(tabs.previous(), Some(TabId::Service(id("c_slack"))));
    assert_eq!(tabs.next(), Some(TabId::Service(id("b_telegram"))));
}

#[test]
fn test_next_from_settings_starts_at_ends() {
    let tabs = manager_with(&three());
    assert_eq!(tabs.active(), &TabId::Settings);

    assert_eq!(tabs.next(), Some(TabId::Service(id("a_whatsapp"))));
    assert_eq!(tabs.previous(), Some(TabId::Service(id("c_slack"))));
}

#[test]
fn test_single_tab_cycles_to_itself() {
    let config = service("a_whatsapp", "whatsapp", true);
    let mut tabs = manager_with(std::slice::from_ref(&config));
    tabs.switch_to(&TabId::Service(config.id.clone()));

    assert_eq!(tabs.next(), Some(TabId::Service(config.id.clone())));
    assert_eq!(tabs.previous(), Some(TabId::Service(config.id)));
}

#[test]
fn test_cycling_without_tabs() {
    let tabs: TabManager<FakeView> = TabManager::new();
    assert_eq!(tabs.next(), None);
    assert_eq!(tabs.previous(), None);
}

// ============================================================================
// Timer Tests
// ============================================================================

#[test]
fn test_tick_polls_due_controllers() {
    let config = service("a_whatsapp", "whatsapp", true);
    let (controller, log) = controller(&config);
    let deadline = controller.next_poll();
    let mut tabs = TabManager::new();
    tabs.add_tab(&config, controller);

    assert_eq!(tabs.next_deadline(), Some(deadline));

    tabs.tick(deadline - Duration::from_millis(1));
    assert_eq!(log.borrow().probe_requests, 0);

    tabs.tick(deadline);
    assert_eq!(log.borrow().probe_requests, 1);
    assert!(tabs.next_deadline().unwrap() > deadline);
}

#[test]
fn test_clear_detaches_everything() {
    let mut tabs = manager_with(&three());
    tabs.switch_to(&TabId::Service(id("b_telegram")));

    let contexts = tabs.clear();

    assert_eq!(contexts.len(), 3);
    assert!(tabs.is_empty());
    assert!(tabs.ui().default_view_options().is_empty());
    assert_eq!(tabs.active(), &TabId::Settings);
    assert_eq!(tabs.next_deadline(), None);
}
