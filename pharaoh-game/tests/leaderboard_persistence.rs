use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{TimeZone, Utc};
use pharaoh_game::{
    Action, FileStorage, GameEngine, Leaderboard, LeaderboardEntry, MemoryStorage, RecordStorage,
    RoomId, SubmitMode, Verification,
};

const KEY: &str = "pharaoh-leaderboard";

fn temp_dir(label: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("pharaoh-{label}-{}-{nanos}", std::process::id()))
}

fn entry(name: &str, score: u32) -> LeaderboardEntry {
    LeaderboardEntry {
        name: name.to_string(),
        score,
        time_remaining: 42,
        date: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    }
}

fn scores(entries: &[LeaderboardEntry]) -> Vec<u32> {
    entries.iter().map(|e| e.score).collect()
}

fn play_perfect(engine: &mut GameEngine<impl RecordStorage>, name: &str) {
    engine.dispatch(Action::SubmitName(name.to_string()));
    engine.dispatch(Action::Start);
    for room in RoomId::ALL {
        let tokens = match &engine.catalog().room(room).unwrap().verification {
            Verification::Positional { solution } => solution.clone(),
            Verification::WeightSum { .. } => vec!["scarab".to_string()],
        };
        for token in tokens {
            engine.pick(&token).unwrap();
        }
        if engine.room().unwrap().def().selection.submit == SubmitMode::Explicit {
            engine.submit().unwrap();
        }
        engine.complete_pending();
    }
}

#[test]
fn unsorted_records_load_best_first() {
    let storage = MemoryStorage::new();
    let board = Leaderboard::new(storage.clone(), KEY, 10);
    board
        .save(&[entry("a", 100), entry("b", 300), entry("c", 200)])
        .unwrap();
    assert_eq!(scores(&board.load()), [300, 200, 100]);
}

#[test]
fn eleventh_run_pushes_out_the_lowest() {
    let board = Leaderboard::new(MemoryStorage::new(), KEY, 10);
    for score in (1..=10).map(|n| n * 100) {
        board.record(entry("runner", score)).unwrap();
    }
    let standing = board.record(entry("late", 550)).unwrap();
    assert_eq!(standing.entries.len(), 10);
    assert_eq!(standing.rank, Some(5));
    assert_eq!(standing.entries.last().unwrap().score, 200);
    assert!(!scores(&board.load()).contains(&100));
}

#[test]
fn garbage_and_wrong_shapes_read_as_empty() {
    let storage = MemoryStorage::new();
    let board = Leaderboard::new(storage.clone(), KEY, 10);
    for raw in ["", "null", "{\"name\":\"x\"}", "[{\"name\":\"x\"}]", "[1,2,3]"] {
        storage.write(KEY, raw).unwrap();
        assert!(board.load().is_empty(), "{raw:?} should read as empty");
    }
}

#[test]
fn stored_json_uses_wire_field_names() {
    let storage = MemoryStorage::new();
    let board = Leaderboard::new(storage.clone(), KEY, 10);
    board.record(entry("Tiye", 4_321)).unwrap();
    let raw = storage.read(KEY).unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let row = &value[0];
    assert_eq!(row["name"], "Tiye");
    assert_eq!(row["score"], 4_321);
    assert_eq!(row["timeRemaining"], 42);
    assert_eq!(row["date"], "2024-05-01T12:00:00Z");
}

#[test]
fn finished_runs_survive_a_restart_on_disk() {
    let dir = temp_dir("board");
    {
        let mut engine = GameEngine::new(FileStorage::new(&dir));
        play_perfect(&mut engine, "Khufu");
        engine.dispatch(Action::Reset);
        play_perfect(&mut engine, "Khafre");
    }
    let engine = GameEngine::new(FileStorage::new(&dir));
    let board = engine.leaderboard();
    let names: Vec<_> = board.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["Khufu", "Khafre"]);
    assert!(board.iter().all(|e| e.score == 5_500 + 1_200 + 2_000));
    assert!(dir.join(format!("{KEY}.json")).exists());
    let _ = std::fs::remove_dir_all(dir);
}
