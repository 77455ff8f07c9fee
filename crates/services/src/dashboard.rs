//! Workspace dashboard aggregation.
//!
//! The snapshot is loaded with a fixed query sequence — active projects,
//! their statuses, members with profiles, all tasks for those projects in
//! one query, recent activity, and (owner only) the subscription — with
//! "today" captured once before any classification. The statistics are then
//! a pure fold over the snapshot, so the same snapshot always yields the
//! same numbers.
//!
//! Date policy: every day-precision comparison goes through `NaiveDate`
//! values derived from the captured instant. Overdue means due strictly
//! before today; a task due today is never overdue.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use db::{
    activity_logs::{ActivityLog, ActivityLogError, ActivityLogRepository},
    project_statuses::{ProjectStatus, ProjectStatusError, ProjectStatusRepository},
    projects::{Project, ProjectError, ProjectRepository},
    subscriptions::{SubscriptionError, SubscriptionRepository, SubscriptionWithPlan},
    tasks::{Task, TaskError, TaskRepository},
    types::WorkspaceRole,
    workspace_members::{MemberProfile, WorkspaceMemberError, WorkspaceMemberRepository},
};
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

/// A task counts as stuck when it is not done and has not been touched for
/// this long.
const STUCK_AFTER_DAYS: i64 = 3;
const VELOCITY_DAYS: i64 = 7;
const TOP_PERFORMERS: usize = 5;
const RECENT_ACTIVITY_LIMIT: i64 = 20;

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    ProjectStatus(#[from] ProjectStatusError),
    #[error(transparent)]
    Member(#[from] WorkspaceMemberError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Activity(#[from] ActivityLogError),
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
}

/// Immutable input to the aggregation, captured at one logical "now". A
/// failed query aborts the whole load; no partial snapshot is published.
#[derive(Debug)]
pub struct DashboardSnapshot {
    pub now: DateTime<Utc>,
    pub today: NaiveDate,
    pub viewer_id: Uuid,
    pub viewer_role: WorkspaceRole,
    pub projects: Vec<Project>,
    pub statuses: Vec<ProjectStatus>,
    pub members: Vec<MemberProfile>,
    pub tasks: Vec<Task>,
    pub activity: Vec<ActivityLog>,
    pub subscription: Option<SubscriptionWithPlan>,
}

impl DashboardSnapshot {
    pub async fn load(
        pool: &PgPool,
        workspace_id: Uuid,
        viewer_id: Uuid,
        viewer_role: WorkspaceRole,
    ) -> Result<Self, DashboardError> {
        let now = Utc::now();
        let today = now.date_naive();

        let projects = ProjectRepository::list_active_by_workspace(pool, workspace_id).await?;
        let project_ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

        let statuses = ProjectStatusRepository::list_by_projects(pool, &project_ids).await?;
        let members = WorkspaceMemberRepository::list_profiles(pool, workspace_id).await?;
        let tasks = TaskRepository::list_by_projects(pool, &project_ids).await?;
        let activity =
            ActivityLogRepository::recent_by_workspace(pool, workspace_id, RECENT_ACTIVITY_LIMIT)
                .await?;

        let subscription = if viewer_role == WorkspaceRole::Owner {
            SubscriptionRepository::current_for_workspace(pool, workspace_id).await?
        } else {
            None
        };

        Ok(Self {
            now,
            today,
            viewer_id,
            viewer_role,
            projects,
            statuses,
            members,
            tasks,
            activity,
            subscription,
        })
    }
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct VelocityPoint {
    pub date: NaiveDate,
    pub created: u32,
    pub completed: u32,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ProjectProgress {
    pub project_id: Uuid,
    pub name: String,
    pub color: String,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub percent_complete: u32,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct PerformerStat {
    pub user_id: Uuid,
    pub display_name: String,
    pub completed_tasks: u32,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct MemberWorkload {
    pub user_id: Uuid,
    pub display_name: String,
    pub open_tasks: u32,
    pub overdue_tasks: u32,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct SubscriptionUsage {
    pub plan_name: String,
    pub member_count: u32,
    pub max_members: i32,
    pub project_count: u32,
    pub max_projects: i32,
}

/// Activity rows joined against the locally built actor/project lookups.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct RecentActivity {
    pub id: Uuid,
    pub actor_name: String,
    pub actor_avatar_url: Option<String>,
    pub project_name: Option<String>,
    pub action: db::types::ActivityAction,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub in_progress_tasks: u32,
    pub due_today: u32,
    pub due_tomorrow: u32,
    pub due_this_month: u32,
    /// Percentage over tasks that have both a due date and a completion
    /// timestamp; 0 when no such task exists.
    pub on_time_completion_rate: u32,
    pub velocity: Vec<VelocityPoint>,
    pub overdue_tasks: Vec<Task>,
    pub stuck_tasks: Vec<Task>,
    pub my_tasks: Vec<Task>,
    pub project_progress: Vec<ProjectProgress>,
    pub recent_activity: Vec<RecentActivity>,
    /// Present for owner/admin viewers only.
    pub top_performers: Option<Vec<PerformerStat>>,
    /// Present for owner/admin viewers only.
    pub member_workload: Option<Vec<MemberWorkload>>,
    /// Present for the owner only.
    pub subscription_usage: Option<SubscriptionUsage>,
}

impl DashboardStats {
    pub fn compute(snapshot: &DashboardSnapshot) -> Self {
        let today = snapshot.today;
        let tomorrow = today + Duration::days(1);
        let stuck_before = snapshot.now - Duration::days(STUCK_AFTER_DAYS);

        let completed_statuses: HashSet<Uuid> = snapshot
            .statuses
            .iter()
            .filter(|s| s.is_completed)
            .map(|s| s.id)
            .collect();

        let is_done =
            |task: &Task| task.completed_at.is_some() || completed_statuses.contains(&task.status_id);

        let total_tasks = snapshot.tasks.len() as u32;
        let mut completed_tasks = 0u32;
        let mut due_today = 0u32;
        let mut due_tomorrow = 0u32;
        let mut due_this_month = 0u32;
        let mut overdue_tasks = Vec::new();
        let mut stuck_tasks = Vec::new();

        for task in &snapshot.tasks {
            if is_done(task) {
                completed_tasks += 1;
                continue;
            }

            if let Some(due) = task.due_date {
                if due < today {
                    overdue_tasks.push(task.clone());
                } else if due == today {
                    due_today += 1;
                } else if due == tomorrow {
                    due_tomorrow += 1;
                }
                if due.year() == today.year() && due.month() == today.month() {
                    due_this_month += 1;
                }
            }

            if task.updated_at <= stuck_before {
                stuck_tasks.push(task.clone());
            }
        }

        let in_progress_tasks = total_tasks - completed_tasks;
        overdue_tasks.sort_by(task_order);
        stuck_tasks.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));

        let mut my_tasks: Vec<Task> = snapshot
            .tasks
            .iter()
            .filter(|t| t.assignee_id == Some(snapshot.viewer_id) && !is_done(t))
            .cloned()
            .collect();
        my_tasks.sort_by(task_order);

        let stats = Self {
            total_tasks,
            completed_tasks,
            in_progress_tasks,
            due_today,
            due_tomorrow,
            due_this_month,
            on_time_completion_rate: on_time_rate(&snapshot.tasks),
            velocity: velocity_series(&snapshot.tasks, today),
            overdue_tasks,
            stuck_tasks,
            my_tasks,
            project_progress: project_progress(snapshot, &is_done),
            recent_activity: join_activity(snapshot),
            top_performers: None,
            member_workload: None,
            subscription_usage: None,
        };

        if !snapshot.viewer_role.at_least(WorkspaceRole::Admin) {
            return stats;
        }

        let mut stats = Self {
            top_performers: Some(top_performers(snapshot, &is_done)),
            member_workload: Some(member_workload(snapshot, &is_done, today)),
            ..stats
        };

        if snapshot.viewer_role == WorkspaceRole::Owner {
            stats.subscription_usage = snapshot.subscription.as_ref().map(|sub| SubscriptionUsage {
                plan_name: sub.plan_name.clone(),
                member_count: snapshot.members.len() as u32,
                max_members: sub.max_members,
                project_count: snapshot.projects.len() as u32,
                max_projects: sub.max_projects,
            });
        }

        stats
    }
}

/// Total order for task lists: due date ascending with missing due dates
/// last, then creation time, then id.
fn task_order(a: &Task, b: &Task) -> std::cmp::Ordering {
    match (a.due_date, b.due_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
    .then_with(|| a.created_at.cmp(&b.created_at))
    .then_with(|| a.id.cmp(&b.id))
}

fn on_time_rate(tasks: &[Task]) -> u32 {
    let measured: Vec<_> = tasks
        .iter()
        .filter_map(|t| Some((t.due_date?, t.completed_at?)))
        .collect();

    if measured.is_empty() {
        return 0;
    }

    let on_time = measured
        .iter()
        .filter(|(due, completed)| completed.date_naive() <= *due)
        .count();

    ((on_time as f64 / measured.len() as f64) * 100.0).round() as u32
}

fn velocity_series(tasks: &[Task], today: NaiveDate) -> Vec<VelocityPoint> {
    (0..VELOCITY_DAYS)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let created = tasks
                .iter()
                .filter(|t| t.created_at.date_naive() == date)
                .count() as u32;
            let completed = tasks
                .iter()
                .filter(|t| t.completed_at.is_some_and(|c| c.date_naive() == date))
                .count() as u32;
            VelocityPoint {
                date,
                created,
                completed,
            }
        })
        .collect()
}

fn project_progress(
    snapshot: &DashboardSnapshot,
    is_done: &impl Fn(&Task) -> bool,
) -> Vec<ProjectProgress> {
    snapshot
        .projects
        .iter()
        .map(|project| {
            let mut total = 0u32;
            let mut completed = 0u32;
            for task in snapshot.tasks.iter().filter(|t| t.project_id == project.id) {
                total += 1;
                if is_done(task) {
                    completed += 1;
                }
            }
            let percent = if total == 0 {
                0
            } else {
                ((completed as f64 / total as f64) * 100.0).round() as u32
            };
            ProjectProgress {
                project_id: project.id,
                name: project.name.clone(),
                color: project.color.clone(),
                total_tasks: total,
                completed_tasks: completed,
                percent_complete: percent,
            }
        })
        .collect()
}

fn top_performers(
    snapshot: &DashboardSnapshot,
    is_done: &impl Fn(&Task) -> bool,
) -> Vec<PerformerStat> {
    let mut completed_by: HashMap<Uuid, u32> = HashMap::new();
    for task in snapshot.tasks.iter().filter(|t| is_done(t)) {
        if let Some(assignee) = task.assignee_id {
            *completed_by.entry(assignee).or_default() += 1;
        }
    }

    let mut performers: Vec<PerformerStat> = snapshot
        .members
        .iter()
        .filter_map(|member| {
            let completed = *completed_by.get(&member.user_id)?;
            Some(PerformerStat {
                user_id: member.user_id,
                display_name: member.display_name.clone(),
                completed_tasks: completed,
            })
        })
        .collect();

    performers.sort_by(|a, b| {
        b.completed_tasks
            .cmp(&a.completed_tasks)
            .then_with(|| a.display_name.cmp(&b.display_name))
    });
    performers.truncate(TOP_PERFORMERS);
    performers
}

fn member_workload(
    snapshot: &DashboardSnapshot,
    is_done: &impl Fn(&Task) -> bool,
    today: NaiveDate,
) -> Vec<MemberWorkload> {
    snapshot
        .members
        .iter()
        .map(|member| {
            let mut open = 0u32;
            let mut overdue = 0u32;
            for task in &snapshot.tasks {
                if task.assignee_id != Some(member.user_id) || is_done(task) {
                    continue;
                }
                open += 1;
                if task.due_date.is_some_and(|due| due < today) {
                    overdue += 1;
                }
            }
            MemberWorkload {
                user_id: member.user_id,
                display_name: member.display_name.clone(),
                open_tasks: open,
                overdue_tasks: overdue,
            }
        })
        .collect()
}

fn join_activity(snapshot: &DashboardSnapshot) -> Vec<RecentActivity> {
    let actors: HashMap<Uuid, &MemberProfile> = snapshot
        .members
        .iter()
        .map(|m| (m.user_id, m))
        .collect();
    let projects: HashMap<Uuid, &Project> =
        snapshot.projects.iter().map(|p| (p.id, p)).collect();

    snapshot
        .activity
        .iter()
        .map(|entry| {
            let actor = actors.get(&entry.actor_id);
            RecentActivity {
                id: entry.id,
                actor_name: actor
                    .map(|a| a.display_name.clone())
                    .unwrap_or_else(|| "Former member".to_string()),
                actor_avatar_url: actor.and_then(|a| a.avatar_url.clone()),
                project_name: entry
                    .project_id
                    .and_then(|id| projects.get(&id))
                    .map(|p| p.name.clone()),
                action: entry.action,
                detail: entry.detail.clone(),
                created_at: entry.created_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use db::types::TaskPriority;

    use super::*;

    struct Fixture {
        snapshot: DashboardSnapshot,
        todo: Uuid,
        done: Uuid,
        project: Uuid,
    }

    fn fixture(viewer_role: WorkspaceRole) -> Fixture {
        let now = Utc::now();
        let project_id = Uuid::new_v4();
        let todo = Uuid::new_v4();
        let done = Uuid::new_v4();
        let viewer = Uuid::new_v4();

        let project = Project {
            id: project_id,
            workspace_id: Uuid::new_v4(),
            name: "Alpha".to_string(),
            color: "#3b82f6".to_string(),
            archived: false,
            created_at: now - Duration::days(30),
            updated_at: now,
        };

        let status = |id, name: &str, is_default, is_completed| ProjectStatus {
            id,
            project_id,
            name: name.to_string(),
            color: "#fff".to_string(),
            position: 0,
            is_default,
            is_completed,
            created_at: now - Duration::days(30),
        };

        Fixture {
            snapshot: DashboardSnapshot {
                now,
                today: now.date_naive(),
                viewer_id: viewer,
                viewer_role,
                projects: vec![project],
                statuses: vec![
                    status(todo, "Todo", true, false),
                    status(done, "Done", false, true),
                ],
                members: Vec::new(),
                tasks: Vec::new(),
                activity: Vec::new(),
                subscription: None,
            },
            todo,
            done,
            project: project_id,
        }
    }

    impl Fixture {
        fn task(&self, title: &str) -> Task {
            Task {
                id: Uuid::new_v4(),
                project_id: self.project,
                status_id: self.todo,
                title: title.to_string(),
                description: None,
                priority: TaskPriority::Medium,
                assignee_id: None,
                due_date: None,
                position: 0.0,
                created_by: self.snapshot.viewer_id,
                completed_at: None,
                timer_started_at: None,
                created_at: self.snapshot.now - Duration::days(10),
                updated_at: self.snapshot.now,
            }
        }

        fn today(&self) -> NaiveDate {
            self.snapshot.today
        }
    }

    #[test]
    fn due_today_count_is_order_independent() {
        let mut fx = fixture(WorkspaceRole::Member);
        let mut a = fx.task("a");
        a.due_date = Some(fx.today());
        let mut b = fx.task("b");
        b.due_date = Some(fx.today());
        let mut c = fx.task("c");
        c.due_date = Some(fx.today() + Duration::days(3));

        fx.snapshot.tasks = vec![c.clone(), a.clone(), b.clone()];
        let forward = DashboardStats::compute(&fx.snapshot);
        fx.snapshot.tasks = vec![b, c, a];
        let shuffled = DashboardStats::compute(&fx.snapshot);

        assert_eq!(forward.due_today, 2);
        assert_eq!(shuffled.due_today, 2);
    }

    #[test]
    fn overdue_requires_strictly_past_due_date_and_sorts_ascending() {
        let mut fx = fixture(WorkspaceRole::Member);
        let mut old = fx.task("old");
        old.due_date = Some(fx.today() - Duration::days(5));
        let mut recent = fx.task("recent");
        recent.due_date = Some(fx.today() - Duration::days(1));
        let mut today = fx.task("today");
        today.due_date = Some(fx.today());

        fx.snapshot.tasks = vec![recent, old, today];
        let stats = DashboardStats::compute(&fx.snapshot);

        let titles: Vec<&str> = stats.overdue_tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["old", "recent"]);
        assert_eq!(stats.due_today, 1);
    }

    #[test]
    fn stuck_needs_three_days_without_update() {
        let mut fx = fixture(WorkspaceRole::Member);
        let mut stale = fx.task("stale");
        stale.updated_at = fx.snapshot.now - Duration::days(4);
        let mut fresh = fx.task("fresh");
        fresh.updated_at = fx.snapshot.now - Duration::days(2);

        fx.snapshot.tasks = vec![stale.clone(), fresh];
        let stats = DashboardStats::compute(&fx.snapshot);

        assert_eq!(stats.stuck_tasks.len(), 1);
        assert_eq!(stats.stuck_tasks[0].id, stale.id);
    }

    #[test]
    fn completed_task_is_never_stuck() {
        let mut fx = fixture(WorkspaceRole::Member);
        let mut task = fx.task("shipped long ago");
        task.status_id = fx.done;
        task.updated_at = fx.snapshot.now - Duration::days(30);

        fx.snapshot.tasks = vec![task];
        let stats = DashboardStats::compute(&fx.snapshot);
        assert!(stats.stuck_tasks.is_empty());
    }

    #[test]
    fn on_time_rate_is_zero_without_measurable_tasks() {
        let mut fx = fixture(WorkspaceRole::Member);
        let mut no_due = fx.task("no due date");
        no_due.completed_at = Some(fx.snapshot.now);
        let mut no_completion = fx.task("open");
        no_completion.due_date = Some(fx.today());

        fx.snapshot.tasks = vec![no_due, no_completion];
        let stats = DashboardStats::compute(&fx.snapshot);
        assert_eq!(stats.on_time_completion_rate, 0);
    }

    #[test]
    fn on_time_rate_rounds_over_measurable_tasks() {
        let mut fx = fixture(WorkspaceRole::Member);
        let mut on_time = fx.task("on time");
        on_time.due_date = Some(fx.today());
        on_time.completed_at = Some(fx.snapshot.now);
        on_time.status_id = fx.done;

        let mut late = fx.task("late");
        late.due_date = Some(fx.today() - Duration::days(2));
        late.completed_at = Some(fx.snapshot.now);
        late.status_id = fx.done;

        let mut also_late = fx.task("also late");
        also_late.due_date = Some(fx.today() - Duration::days(1));
        also_late.completed_at = Some(fx.snapshot.now);
        also_late.status_id = fx.done;

        fx.snapshot.tasks = vec![on_time, late, also_late];
        let stats = DashboardStats::compute(&fx.snapshot);
        // 1 of 3 on time -> 33.33 -> 33
        assert_eq!(stats.on_time_completion_rate, 33);
    }

    #[test]
    fn completing_a_task_clears_it_from_overdue_and_stuck() {
        let mut fx = fixture(WorkspaceRole::Member);
        let mut task = fx.task("was overdue");
        task.due_date = Some(fx.today() - Duration::days(10));
        task.updated_at = fx.snapshot.now - Duration::days(10);

        fx.snapshot.tasks = vec![task.clone()];
        let before = DashboardStats::compute(&fx.snapshot);
        assert_eq!(before.overdue_tasks.len(), 1);
        assert_eq!(before.stuck_tasks.len(), 1);

        // Move to the completed status; due date stays in the past.
        task.status_id = fx.done;
        fx.snapshot.tasks = vec![task];
        let after = DashboardStats::compute(&fx.snapshot);
        assert!(after.overdue_tasks.is_empty());
        assert!(after.stuck_tasks.is_empty());
        assert_eq!(after.completed_tasks, 1);
    }

    #[test]
    fn my_tasks_total_order_puts_undated_last() {
        let mut fx = fixture(WorkspaceRole::Member);
        let viewer = fx.snapshot.viewer_id;

        let mut later = fx.task("later");
        later.assignee_id = Some(viewer);
        later.due_date = Some(fx.today() + Duration::days(5));
        let mut soon = fx.task("soon");
        soon.assignee_id = Some(viewer);
        soon.due_date = Some(fx.today() + Duration::days(1));
        let mut undated_old = fx.task("undated old");
        undated_old.assignee_id = Some(viewer);
        undated_old.created_at = fx.snapshot.now - Duration::days(20);
        let mut undated_new = fx.task("undated new");
        undated_new.assignee_id = Some(viewer);
        undated_new.created_at = fx.snapshot.now - Duration::days(1);

        fx.snapshot.tasks = vec![undated_new, later, undated_old, soon];
        let stats = DashboardStats::compute(&fx.snapshot);
        let titles: Vec<&str> = stats.my_tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, ["soon", "later", "undated old", "undated new"]);
    }

    #[test]
    fn workload_and_performers_are_gated_to_admins() {
        let mut member_view = fixture(WorkspaceRole::Member);
        member_view.snapshot.tasks = vec![member_view.task("t")];
        let stats = DashboardStats::compute(&member_view.snapshot);
        assert!(stats.top_performers.is_none());
        assert!(stats.member_workload.is_none());
        assert!(stats.subscription_usage.is_none());

        let admin_view = fixture(WorkspaceRole::Admin);
        let stats = DashboardStats::compute(&admin_view.snapshot);
        assert!(stats.top_performers.is_some());
        assert!(stats.member_workload.is_some());
        // Usage stays owner-only.
        assert!(stats.subscription_usage.is_none());
    }

    #[test]
    fn velocity_series_covers_seven_days_ending_today() {
        let mut fx = fixture(WorkspaceRole::Member);
        let mut created_yesterday = fx.task("a");
        created_yesterday.created_at = fx.snapshot.now - Duration::days(1);
        let mut completed_today = fx.task("b");
        completed_today.status_id = fx.done;
        completed_today.completed_at = Some(fx.snapshot.now);

        fx.snapshot.tasks = vec![created_yesterday, completed_today];
        let stats = DashboardStats::compute(&fx.snapshot);

        assert_eq!(stats.velocity.len(), 7);
        assert_eq!(stats.velocity.last().unwrap().date, fx.today());
        assert_eq!(stats.velocity.last().unwrap().completed, 1);
        assert_eq!(stats.velocity[5].created, 1);
    }

    /// The worked scenario from the product brief: two projects, one task
    /// overdue, one due today, one completed late.
    #[test]
    fn mixed_scenario_counts_line_up() {
        let mut fx = fixture(WorkspaceRole::Member);

        let mut overdue = fx.task("due yesterday");
        overdue.due_date = Some(fx.today() - Duration::days(1));

        let mut due_today = fx.task("due today");
        due_today.due_date = Some(fx.today());

        let mut late_done = fx.task("done late");
        late_done.due_date = Some(fx.today() - Duration::days(3));
        late_done.status_id = fx.done;
        late_done.completed_at = Some(fx.snapshot.now);

        fx.snapshot.tasks = vec![overdue, due_today, late_done];
        let stats = DashboardStats::compute(&fx.snapshot);

        assert_eq!(stats.overdue_tasks.len(), 1);
        assert_eq!(stats.due_today, 1);
        assert_eq!(stats.completed_tasks, 1);
        // The only measurable completion was late.
        assert_eq!(stats.on_time_completion_rate, 0);
    }
}
