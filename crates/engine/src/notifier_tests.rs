// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn subscriber_sees_latest_epoch() {
    let notifier = ChangeNotifier::new(0);
    let mut sub = notifier.subscribe();

    notifier.notify(1);
    notifier.notify(2);
    assert_eq!(sub.changed().await, Some(2));
}

#[tokio::test]
async fn older_epochs_are_ignored() {
    let notifier = ChangeNotifier::new(5);
    let mut sub = notifier.subscribe();

    assert!(!notifier.notify(3));
    assert!(!notifier.notify(5));
    assert_eq!(notifier.epoch(), 5);

    assert!(notifier.notify(6));
    assert_eq!(sub.changed().await, Some(6));
}

#[tokio::test]
async fn closed_notifier_ends_subscription() {
    let notifier = ChangeNotifier::new(0);
    let mut sub = notifier.subscribe();
    drop(notifier);
    assert_eq!(sub.changed().await, None);
}
