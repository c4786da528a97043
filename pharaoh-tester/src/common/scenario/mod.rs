pub mod catalog;

use crate::logic::game_tester::SimulationPlan;

/// A named plan the logic tester can run across seeds.
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Keys that the `all` keyword expands to, in run order.
pub const ALL_SCENARIOS: [&str; 9] = [
    "smoke",
    "sloppy",
    "hint-seeker",
    "idle-timeout",
    "fumbler",
    "stale-signals",
    "last-second",
    "too-slow",
    "realtime",
];

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let scenario = match name.to_lowercase().as_str() {
        "smoke" | "perfect" => catalog::smoke(),
        "sloppy" => catalog::sloppy(),
        "hint-seeker" | "hints" => catalog::hint_seeker(),
        "idle-timeout" | "idle" => catalog::idle_timeout(),
        "fumbler" | "random-walk" => catalog::fumbler(),
        "stale-signals" | "stale" => catalog::stale_signals(),
        "last-second" => catalog::last_second(),
        "too-slow" => catalog::too_slow(),
        "realtime" | "async" => catalog::realtime(),
        _ => return None,
    };
    Some(scenario)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Perfect run through all five rooms"),
        ("sloppy", "One failed attempt in every room"),
        ("hint-seeker", "Reveal every hint before solving"),
        ("idle-timeout", "Never touch a token and let the clock expire"),
        ("fumbler", "Seeded random play with mostly correct inputs"),
        ("stale-signals", "Out-of-order room signals are ignored"),
        ("last-second", "Escape with one second on the clock"),
        ("too-slow", "Run out of time in the sarcophagus chamber"),
        ("realtime", "Perfect run on the async clock runner"),
    ]
}
