use cpm_engine::{ProjectMetadata, ScheduleError, SchedulingEngine, Task};

fn engine_with_project() -> (SchedulingEngine, i64) {
    let engine = SchedulingEngine::new();
    let project = engine.create_project(ProjectMetadata::default());
    engine
        .update_project(project, |p| {
            for id in 1..=4 {
                p.add_task(Task::new(id, format!("Task {id}"), 2));
            }
            p.add_dependency(2, 4).unwrap();
            p.add_dependency(3, 4).unwrap();
        })
        .unwrap();
    (engine, project)
}

#[test]
fn reconcile_applies_minimal_edits_and_marks_dirty() {
    let (engine, project) = engine_with_project();
    engine.recalculate(project).unwrap();
    assert!(!engine.needs_recalculation(project).unwrap());

    let plan = engine.reconcile(project, 4, &[1, 2]).unwrap();
    assert_eq!(plan.to_add, vec![1]);
    assert_eq!(plan.to_remove, vec![3]);

    assert!(engine.needs_recalculation(project).unwrap());
    engine
        .with_project(project, |p| {
            assert_eq!(p.graph.predecessors_of(4), &[2, 1]);
            assert!(!p.graph.successors_of(3).contains(&4));
        })
        .unwrap();
}

#[test]
fn reconcile_twice_is_a_noop_the_second_time() {
    let (engine, project) = engine_with_project();

    let first = engine.reconcile(project, 4, &[1, 2]).unwrap();
    assert!(!first.is_noop());

    engine.recalculate(project).unwrap();
    let second = engine.reconcile(project, 4, &[1, 2]).unwrap();
    assert!(second.is_noop());
    // The no-op must not flip the dirty flag back on.
    assert!(!engine.needs_recalculation(project).unwrap());

    let counters = engine.sync_counters();
    assert_eq!(counters.created, 1);
    assert_eq!(counters.removed, 1);
    assert_eq!(counters.skipped, 1);
}

#[test]
fn reconcile_rejects_a_self_dependency() {
    let (engine, project) = engine_with_project();
    let err = engine.reconcile(project, 4, &[4]).unwrap_err();
    assert!(matches!(err, ScheduleError::SelfDependency(4)));
}

#[test]
fn reconcile_rejects_unknown_predecessors() {
    let (engine, project) = engine_with_project();
    let err = engine.reconcile(project, 4, &[99]).unwrap_err();
    assert!(matches!(err, ScheduleError::UnknownTask(99)));
}

#[test]
fn rejected_reconcile_leaves_graph_and_dirty_flag_untouched() {
    let (engine, project) = engine_with_project();
    engine.recalculate(project).unwrap();

    // One valid and one unknown predecessor: nothing may be applied.
    let err = engine.reconcile(project, 4, &[1, 99]).unwrap_err();
    assert!(matches!(err, ScheduleError::UnknownTask(99)));

    engine
        .with_project(project, |p| {
            assert_eq!(p.graph.predecessors_of(4), &[2, 3]);
            assert!(!p.graph.successors_of(1).contains(&4));
        })
        .unwrap();
    // No structural change happened, so the schedule is still current.
    assert!(!engine.needs_recalculation(project).unwrap());
}

#[test]
fn reconcile_clearing_all_predecessors_removes_every_edge() {
    let (engine, project) = engine_with_project();
    let plan = engine.reconcile(project, 4, &[]).unwrap();
    assert!(plan.to_add.is_empty());
    assert_eq!(plan.to_remove, vec![2, 3]);

    engine
        .with_project(project, |p| {
            assert!(p.graph.predecessors_of(4).is_empty());
            assert!(p.graph.successors_of(2).is_empty());
        })
        .unwrap();
}
