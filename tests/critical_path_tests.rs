use chrono::{NaiveDate, Utc};
use cpm_engine::{
    recalculate_full, ConstraintKind, Project, ProjectMetadata, RecalcOptions, Task,
    CalendarRegistry, OutlineNode,
};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// 2025-01-06 is a Monday.
fn project_starting_monday() -> Project {
    let mut metadata = ProjectMetadata::default();
    metadata.project_start_date = d(2025, 1, 6);
    Project::new(1, metadata)
}

fn recalc(project: &mut Project) -> cpm_engine::RecalculationResult {
    recalculate_full(
        project,
        &CalendarRegistry::new(),
        RecalcOptions::default(),
        Utc::now(),
    )
}

#[test]
fn chain_of_three_is_fully_critical() {
    let mut p = project_starting_monday();
    p.add_task(Task::new(1, "A", 1));
    p.add_task(Task::new(2, "B", 1));
    p.add_task(Task::new(3, "C", 1));
    p.add_dependency(1, 2).unwrap();
    p.add_dependency(2, 3).unwrap();

    let result = recalc(&mut p);
    assert!(result.success);

    for id in 1..=3 {
        let info = result.schedule_for(id).unwrap();
        assert!(info.is_critical, "task {id} should be critical");
        assert_eq!(info.total_slack, Some(0));
    }
    // One working day each: Mon, Tue, Wed.
    assert_eq!(result.schedule_for(1).unwrap().start, Some(d(2025, 1, 6)));
    assert_eq!(result.schedule_for(2).unwrap().start, Some(d(2025, 1, 7)));
    assert_eq!(result.schedule_for(3).unwrap().finish, Some(d(2025, 1, 8)));
    assert_eq!(result.project_finish, Some(d(2025, 1, 8)));
    assert_eq!(result.critical_path, vec![1, 2, 3]);
}

#[test]
fn parallel_branches_give_slack_to_the_short_one() {
    let mut p = project_starting_monday();
    p.add_task(Task::new(1, "long", 5));
    p.add_task(Task::new(2, "short", 2));

    let result = recalc(&mut p);
    assert!(result.success);

    let long = result.schedule_for(1).unwrap();
    assert_eq!(long.total_slack, Some(0));
    assert!(long.is_critical);
    assert_eq!(long.finish, Some(d(2025, 1, 10)));

    let short = result.schedule_for(2).unwrap();
    assert_eq!(short.total_slack, Some(3));
    assert!(!short.is_critical);

    assert_eq!(result.critical_path, vec![1]);
}

#[test]
fn imposed_deadline_drives_slack_negative() {
    let mut p = project_starting_monday();
    p.add_task(Task::new(1, "A", 5));
    p.add_task(Task::new(2, "B", 5));
    p.add_dependency(1, 2).unwrap();
    // Computed finish would be Fri 2025-01-17; impose ten working days
    // earlier.
    p.metadata.imposed_finish_date = Some(d(2025, 1, 3));

    let result = recalc(&mut p);
    assert!(result.success);

    let a = result.schedule_for(1).unwrap();
    let b = result.schedule_for(2).unwrap();
    assert_eq!(b.finish, Some(d(2025, 1, 17)));
    assert_eq!(a.total_slack, Some(-10));
    assert_eq!(b.total_slack, Some(-10));
    assert!(a.is_critical && b.is_critical);
}

#[test]
fn tasks_without_predecessors_anchor_at_project_start() {
    let mut p = project_starting_monday();
    p.add_task(Task::new(1, "A", 3));
    p.add_task(Task::new(2, "B", 1));
    p.add_task(Task::new(3, "C", 2));

    // No dependency edges at all: a valid degenerate shape.
    let result = recalc(&mut p);
    assert!(result.success);
    for id in 1..=3 {
        assert_eq!(result.schedule_for(id).unwrap().start, Some(d(2025, 1, 6)));
    }
}

#[test]
fn weekend_is_not_working_time() {
    let mut p = project_starting_monday();
    // Four days starting Thursday: Thu, Fri, Mon, Tue.
    p.metadata.project_start_date = d(2025, 1, 9);
    p.add_task(Task::new(1, "A", 4));

    let result = recalc(&mut p);
    assert_eq!(result.schedule_for(1).unwrap().finish, Some(d(2025, 1, 14)));
}

#[test]
fn start_no_earlier_than_constraint_pushes_start() {
    let mut p = project_starting_monday();
    p.add_task(Task::new(1, "A", 1).with_constraint(ConstraintKind::StartNoEarlierThan, d(2025, 1, 11)));

    let result = recalc(&mut p);
    // Saturday constraint date rolls forward to Monday.
    assert_eq!(result.schedule_for(1).unwrap().start, Some(d(2025, 1, 13)));
}

#[test]
fn total_slack_invariant_holds_for_every_task() {
    let mut p = project_starting_monday();
    p.add_task(Task::new(1, "A", 2));
    p.add_task(Task::new(2, "B", 3));
    p.add_task(Task::new(3, "C", 1));
    p.add_task(Task::new(4, "D", 2));
    p.add_dependency(1, 2).unwrap();
    p.add_dependency(1, 3).unwrap();
    p.add_dependency(2, 4).unwrap();
    p.add_dependency(3, 4).unwrap();

    let result = recalc(&mut p);
    assert!(result.success);
    for info in &result.tasks {
        let task = p.graph.get(info.task_id).unwrap();
        let slack = task.total_slack.unwrap();
        // critical implies slack at or under the threshold
        if info.is_critical {
            assert!(slack <= 0);
        } else {
            assert!(slack > 0);
        }
    }
    // Path through B is critical, C has slack.
    assert!(result.schedule_for(2).unwrap().is_critical);
    assert_eq!(result.schedule_for(3).unwrap().total_slack, Some(2));
}

#[test]
fn summary_windows_union_children_and_stay_uncritical() {
    let mut p = project_starting_monday();
    p.add_task(Task::summary(10, "Phase"));
    p.add_task(Task::summary(20, "Subphase"));
    p.add_task(Task::new(1, "A", 2));
    p.add_task(Task::new(2, "B", 3));
    p.add_task(Task::new(3, "C", 1));
    p.add_dependency(1, 2).unwrap();
    p.set_outline(Some(OutlineNode::group(
        10,
        vec![
            OutlineNode::leaf(1),
            OutlineNode::group(20, vec![OutlineNode::leaf(2), OutlineNode::leaf(3)]),
        ],
    )));

    let result = recalc(&mut p);
    assert!(result.success);

    let phase = p.graph.get(10).unwrap();
    assert_eq!(phase.early_start, Some(d(2025, 1, 6)));
    assert_eq!(phase.early_finish, Some(d(2025, 1, 10))); // B ends Friday
    assert!(!phase.is_critical);
    assert!(phase.total_slack.is_none());

    let sub = p.graph.get(20).unwrap();
    assert_eq!(sub.early_start, Some(d(2025, 1, 6))); // C starts Monday
    assert_eq!(sub.early_finish, Some(d(2025, 1, 10)));

    // Derived queries over descendants.
    assert!(p.graph.contains_critical_children(&p.wbs, 10));
    assert_eq!(p.graph.min_child_slack(&p.wbs, 10), Some(0));
}

#[test]
fn summary_aggregation_is_idempotent() {
    let mut p = project_starting_monday();
    p.add_task(Task::summary(10, "Phase"));
    p.add_task(Task::new(1, "A", 2));
    p.add_task(Task::new(2, "B", 4));
    p.set_outline(Some(OutlineNode::group(
        10,
        vec![OutlineNode::leaf(1), OutlineNode::leaf(2)],
    )));

    recalc(&mut p);
    let first = p.graph.get(10).unwrap().clone();
    recalc(&mut p);
    let second = p.graph.get(10).unwrap();
    assert_eq!(first.early_start, second.early_start);
    assert_eq!(first.early_finish, second.early_finish);
    assert_eq!(first.late_start, second.late_start);
    assert_eq!(first.late_finish, second.late_finish);
}

#[test]
fn cycle_fails_without_touching_last_good_schedule() {
    let mut p = project_starting_monday();
    p.add_task(Task::new(1, "A", 1));
    p.add_task(Task::new(2, "B", 1));
    p.add_dependency(1, 2).unwrap();

    let first = recalc(&mut p);
    assert!(first.success);
    let good_start = p.graph.get(2).unwrap().early_start;

    p.add_dependency(2, 1).unwrap();
    let second = recalc(&mut p);
    assert!(!second.success);
    assert!(second.error.as_deref().unwrap().contains("structural reset"));
    // Prior schedule untouched.
    assert_eq!(p.graph.get(2).unwrap().early_start, good_start);
}

#[test]
fn external_task_anchors_successor_without_being_scheduled() {
    let mut p = project_starting_monday();
    let mut vendor = Task::external(1, "vendor feed");
    vendor.early_finish = Some(d(2025, 1, 20));
    p.add_task(vendor);
    p.add_task(Task::new(2, "integrate", 2));
    p.add_dependency(1, 2).unwrap();

    let result = recalc(&mut p);
    assert!(result.success);
    // Successor starts the working day after the external anchor.
    assert_eq!(result.schedule_for(2).unwrap().start, Some(d(2025, 1, 21)));
    // The external task itself keeps its stored dates and no flags.
    let ext = p.graph.get(1).unwrap();
    assert_eq!(ext.early_finish, Some(d(2025, 1, 20)));
    assert!(!ext.is_critical);
}

#[test]
fn aux_finish_date_written_back_when_no_deadline_imposed() {
    let mut p = project_starting_monday();
    p.add_task(Task::new(1, "A", 3));

    recalc(&mut p);
    assert_eq!(p.metadata.project_end_date, d(2025, 1, 8));
    // A second run resolves the same deadline and schedule.
    let again = recalc(&mut p);
    assert_eq!(again.project_finish, Some(d(2025, 1, 8)));
    assert_eq!(p.metadata.project_end_date, d(2025, 1, 8));
}
