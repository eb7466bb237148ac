use r2do_core::db::open_db_in_memory;
use r2do_core::{RelationalStore, SnapshotStore, State, StateError, StateResult, StateStore};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const NAMES: &[&str] = &["work", "home", "errands", "gym", ""];
const DESCRIPTIONS: &[&str] = &[
    "buy milk",
    "call mom",
    "pay rent",
    "water plants",
    "",
    "this description is far too long to keep",
];

#[derive(Debug, Clone, Copy)]
enum Op {
    Add(&'static str),
    SelectOrCreate(&'static str),
    SetCurrent(&'static str),
    ClearCurrent,
    Rename(&'static str, &'static str),
    Remove(&'static str),
    AddTask(&'static str, &'static str),
    Complete(&'static str),
    MarkCurrentTask(&'static str),
    ClearCurrentTask,
    RemoveTask(&'static str, &'static str),
    Reset,
}

fn random_op(rng: &mut StdRng) -> Op {
    let name = |rng: &mut StdRng| *NAMES.choose(rng).unwrap();
    let description = |rng: &mut StdRng| *DESCRIPTIONS.choose(rng).unwrap();
    match rng.gen_range(0..12) {
        0 => Op::Add(name(rng)),
        1 => Op::SelectOrCreate(name(rng)),
        2 => Op::SetCurrent(name(rng)),
        3 => Op::ClearCurrent,
        4 => Op::Rename(name(rng), name(rng)),
        5 => Op::Remove(name(rng)),
        6 => Op::AddTask(name(rng), description(rng)),
        7 => Op::Complete(description(rng)),
        8 => Op::MarkCurrentTask(description(rng)),
        9 => Op::ClearCurrentTask,
        10 => Op::RemoveTask(name(rng), description(rng)),
        _ => Op::Reset,
    }
}

fn apply<S: StateStore>(state: &mut State<S>, op: Op) -> Result<(), String> {
    let result: StateResult<()> = match op {
        Op::Add(name) => state.add(name).map(|_| ()),
        Op::SelectOrCreate(name) => state.select_or_create(name).map(|_| ()),
        Op::SetCurrent(name) => state.set_current(name),
        Op::ClearCurrent => state.clear_current_category(),
        Op::Rename(from, to) => state.rename(from, to),
        Op::Remove(name) => state.remove(name),
        Op::AddTask(name, description) => state.add_task(name, description).map(|_| ()),
        Op::Complete(description) => state.complete_task(description).map(|_| ()),
        Op::MarkCurrentTask(description) => state.mark_current_task(description),
        Op::ClearCurrentTask => state.clear_current_task(),
        Op::RemoveTask(name, description) => state.remove_task(name, description),
        Op::Reset => state.reset(),
    };
    result.map_err(|err| match err {
        StateError::Store(store_err) => panic!("unexpected store error for {op:?}: {store_err}"),
        other => other.to_string(),
    })
}

type View = (Vec<(String, Vec<(String, bool)>)>, Option<String>, Option<String>);

fn view<S: StateStore>(state: &State<S>) -> View {
    let categories = state
        .categories()
        .iter()
        .map(|category| {
            let tasks = category
                .tasks
                .iter()
                .map(|task| (task.description.clone(), task.done))
                .collect();
            (category.name.clone(), tasks)
        })
        .collect();
    (
        categories,
        state.current_category().map(|category| category.name.clone()),
        state.current_task().map(|task| task.description.clone()),
    )
}

fn assert_invariants<S: StateStore>(state: &State<S>, step: usize) {
    let current_categories = state
        .categories()
        .iter()
        .filter(|category| state.is_current(category))
        .count();
    assert!(current_categories <= 1, "step {step}: {current_categories} current categories");

    let holders: Vec<_> = state
        .categories()
        .iter()
        .filter(|category| category.current_task.is_some())
        .collect();
    assert!(holders.len() <= 1, "step {step}: {} current tasks", holders.len());
    if let Some(holder) = holders.first() {
        assert!(state.is_current(holder), "step {step}: current task outside current category");
        assert!(holder.current_task().is_some(), "step {step}: dangling current task");
    }

    let mut names: Vec<&str> = state
        .categories()
        .iter()
        .map(|category| category.name.as_str())
        .collect();
    let total = names.len();
    names.sort_unstable();
    names.dedup();
    assert_eq!(names.len(), total, "step {step}: duplicate category names");
}

#[test]
fn random_operation_sequences_keep_invariants_and_backends_in_lockstep() {
    for seed in 0..16_u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("r2do_data.json");
        let conn = open_db_in_memory().unwrap();

        let mut snapshot_state = State::open(SnapshotStore::new(&json_path)).unwrap();
        let mut relational_state = State::open(RelationalStore::try_new(&conn).unwrap()).unwrap();

        for step in 0..120 {
            let op = random_op(&mut rng);
            let from_snapshot = apply(&mut snapshot_state, op);
            let from_relational = apply(&mut relational_state, op);
            assert_eq!(
                from_snapshot, from_relational,
                "seed {seed} step {step}: outcomes diverged for {op:?}"
            );

            assert_invariants(&snapshot_state, step);
            assert_invariants(&relational_state, step);
            assert_eq!(
                view(&snapshot_state),
                view(&relational_state),
                "seed {seed} step {step}: state diverged after {op:?}"
            );
        }

        let expected = view(&snapshot_state);
        snapshot_state.close().unwrap();
        relational_state.close().unwrap();

        let reopened_snapshot = State::open(SnapshotStore::new(&json_path)).unwrap();
        let reopened_relational = State::open(RelationalStore::try_new(&conn).unwrap()).unwrap();
        assert_eq!(view(&reopened_snapshot), expected, "seed {seed}: snapshot restart");
        assert_eq!(view(&reopened_relational), expected, "seed {seed}: relational restart");
    }
}
