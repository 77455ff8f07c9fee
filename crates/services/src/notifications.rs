//! Notification creation and push delivery policy.
//!
//! Writing the notification row always succeeds or fails with the caller;
//! push delivery is best-effort on top of it. Whether a push goes out is a
//! pure decision over the user's preferences: the per-kind toggle and the
//! quiet-hours window (local "HH:MM", may wrap midnight).

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};
use db::{
    notification_preferences::{
        NotificationPreferenceRepository, NotificationPreferences, PushSubscription,
    },
    notifications::{Notification, NotificationError, NotificationRepository},
    types::{NotificationKind, NotificationTarget},
};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    events::{ChangePayload, EventHub, EventScope, RowChange},
    functions::{FunctionsClient, PushNotificationRequest},
};

#[derive(Debug, Error)]
pub enum NotificationServiceError {
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Preference(#[from] db::notification_preferences::NotificationPreferenceError),
}

/// True when `at` falls inside the quiet window. A window whose end is not
/// after its start wraps midnight, e.g. 22:00-07:00.
pub fn in_quiet_hours(start: NaiveTime, end: NaiveTime, at: NaiveTime) -> bool {
    if start < end {
        at >= start && at < end
    } else {
        at >= start || at < end
    }
}

/// Resolves the user's wall-clock time from a stored offset string. The
/// product stores offsets as "UTC", "UTC+HH:MM" or "UTC-HH:MM"; anything
/// unparseable falls back to UTC rather than suppressing delivery.
pub fn local_time(timezone: &str, now: DateTime<Utc>) -> NaiveTime {
    parse_offset(timezone)
        .map(|offset| now.with_timezone(&offset).time())
        .unwrap_or_else(|| now.time())
}

fn parse_offset(timezone: &str) -> Option<FixedOffset> {
    let rest = timezone.strip_prefix("UTC")?;
    if rest.is_empty() {
        return FixedOffset::east_opt(0);
    }
    let (sign, hhmm) = rest.split_at(1);
    let (hours, minutes) = hhmm.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    let seconds = hours * 3600 + minutes * 60;
    match sign {
        "+" => FixedOffset::east_opt(seconds),
        "-" => FixedOffset::west_opt(seconds),
        _ => None,
    }
}

/// Pure delivery decision for one user at one instant.
pub fn should_deliver(
    prefs: &NotificationPreferences,
    kind: NotificationKind,
    now: DateTime<Utc>,
) -> bool {
    if !prefs.allows(kind) {
        return false;
    }

    let window = prefs
        .quiet_hours_start
        .as_deref()
        .zip(prefs.quiet_hours_end.as_deref())
        .and_then(|(start, end)| {
            let start = NaiveTime::parse_from_str(start, "%H:%M").ok()?;
            let end = NaiveTime::parse_from_str(end, "%H:%M").ok()?;
            Some((start, end))
        });

    match window {
        Some((start, end)) => !in_quiet_hours(start, end, local_time(&prefs.timezone, now)),
        None => true,
    }
}

#[derive(Clone)]
pub struct NotificationService {
    events: EventHub,
    functions: FunctionsClient,
}

impl NotificationService {
    pub fn new(events: EventHub, functions: FunctionsClient) -> Self {
        Self { events, functions }
    }

    /// Records the notification, publishes it to the user's realtime scope,
    /// and attempts push delivery. Push failures are logged and swallowed;
    /// they never fail the write that triggered the notification.
    #[allow(clippy::too_many_arguments)]
    pub async fn notify(
        &self,
        pool: &PgPool,
        user_id: Uuid,
        workspace_id: Uuid,
        kind: NotificationKind,
        title: String,
        body: Option<String>,
        target_type: NotificationTarget,
        target_id: Uuid,
    ) -> Result<Notification, NotificationServiceError> {
        let notification = NotificationRepository::create(
            pool,
            user_id,
            workspace_id,
            kind,
            title,
            body,
            target_type,
            target_id,
        )
        .await?;

        self.events.publish(
            EventScope::Notifications {
                workspace_id,
                user_id,
            },
            ChangePayload::Notification(RowChange::Insert {
                row: notification.clone(),
            }),
        );

        self.push_best_effort(pool, &notification).await;

        Ok(notification)
    }

    async fn push_best_effort(&self, pool: &PgPool, notification: &Notification) {
        let prefs = match NotificationPreferenceRepository::find(pool, notification.user_id).await {
            Ok(found) => found.unwrap_or_else(|| {
                NotificationPreferences::defaults(notification.user_id)
            }),
            Err(error) => {
                tracing::error!(?error, user_id = %notification.user_id, "failed to load notification preferences");
                return;
            }
        };

        if !should_deliver(&prefs, notification.kind, Utc::now()) {
            return;
        }

        let subscriptions =
            match NotificationPreferenceRepository::list_push_subscriptions(pool, notification.user_id)
                .await
            {
                Ok(subs) => subs,
                Err(error) => {
                    tracing::error!(?error, user_id = %notification.user_id, "failed to load push subscriptions");
                    return;
                }
            };

        for subscription in subscriptions {
            self.push_to_device(notification, &subscription).await;
        }
    }

    async fn push_to_device(&self, notification: &Notification, subscription: &PushSubscription) {
        let request = PushNotificationRequest {
            token: subscription.token.clone(),
            platform: subscription.platform.clone(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            workspace_id: notification.workspace_id,
        };

        if let Err(error) = self.functions.send_push_notification(&request).await {
            tracing::warn!(
                ?error,
                user_id = %notification.user_id,
                device_id = %subscription.device_id,
                "push delivery failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn prefs() -> NotificationPreferences {
        NotificationPreferences::defaults(Uuid::new_v4())
    }

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn quiet_window_within_one_day() {
        let start = at(13, 0);
        let end = at(14, 0);
        assert!(in_quiet_hours(start, end, at(13, 30)));
        assert!(!in_quiet_hours(start, end, at(14, 0)));
        assert!(!in_quiet_hours(start, end, at(12, 59)));
    }

    #[test]
    fn quiet_window_wrapping_midnight() {
        let start = at(22, 0);
        let end = at(7, 0);
        assert!(in_quiet_hours(start, end, at(23, 30)));
        assert!(in_quiet_hours(start, end, at(2, 0)));
        assert!(!in_quiet_hours(start, end, at(7, 0)));
        assert!(!in_quiet_hours(start, end, at(12, 0)));
    }

    #[test]
    fn disabled_kind_suppresses_delivery() {
        let mut prefs = prefs();
        prefs.chat_message = false;
        assert!(!should_deliver(
            &prefs,
            NotificationKind::ChatMessage,
            Utc::now()
        ));
        assert!(should_deliver(
            &prefs,
            NotificationKind::TaskAssigned,
            Utc::now()
        ));
    }

    #[test]
    fn quiet_hours_respect_stored_offset() {
        let mut prefs = prefs();
        prefs.quiet_hours_start = Some("22:00".to_string());
        prefs.quiet_hours_end = Some("07:00".to_string());
        prefs.timezone = "UTC+05:45".to_string();

        // 17:00 UTC is 22:45 in UTC+05:45 -> inside the window.
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 17, 0, 0).unwrap();
        assert!(!should_deliver(&prefs, NotificationKind::ChatMessage, now));

        // 09:00 UTC is 14:45 local -> outside.
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        assert!(should_deliver(&prefs, NotificationKind::ChatMessage, now));
    }

    #[test]
    fn unparseable_timezone_falls_back_to_utc() {
        assert_eq!(
            local_time("Asia/Kathmandu", Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap()),
            at(9, 30)
        );
    }
}
