use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::game_tester::{GameTester, SimulationPlan, SimulationSummary};
use crate::logic::storage::TesterStorage;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// Best total among iterations that escaped the tomb.
    pub best_score: Option<u32>,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    verbose: bool,
    storage: TesterStorage,
}

impl LogicTester {
    pub const fn new(storage: TesterStorage, verbose: bool) -> Self {
        Self { verbose, storage }
    }

    pub async fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (strategy: {} seed: {})",
                    scenario.name.bright_white(),
                    scenario.plan.strategy,
                    seed
                );
            }

            let result = self.run_single_scenario(scenario, seed, iterations).await;
            results.push(result);
        }

        results
    }

    async fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let outcome = self.run_simulation_iterations(&scenario.plan, seed, iterations).await;

        let average_duration = if outcome.performance_data.is_empty() {
            Duration::ZERO
        } else {
            outcome.performance_data.iter().sum::<Duration>()
                / u32::try_from(outcome.performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: outcome.failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: outcome.successes,
            failures: outcome.failures,
            best_score: outcome.best_score,
            average_duration,
            performance_data: outcome.performance_data,
        }
    }

    async fn run_simulation_iterations(
        &self,
        plan: &SimulationPlan,
        seed: u64,
        iterations: usize,
    ) -> IterationOutcome {
        let tester = GameTester::new(self.storage.clone(), self.verbose);
        let mut outcome = IterationOutcome::default();

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let (err, context) = match tester.run_plan(plan, iteration_seed).await {
                Ok(summary) => {
                    if let Some(run) = &summary.run {
                        outcome.best_score = outcome.best_score.max(Some(run.total));
                    }
                    let Some(err) = evaluate_expectations(plan, &summary) else {
                        outcome.successes += 1;
                        let duration = start_time.elapsed();
                        outcome.performance_data.push(duration);

                        if self.verbose {
                            println!(
                                "  ✅ Iteration {}/{} passed ({duration:?}) {} moves:{} strategy:{}",
                                i + 1,
                                iterations,
                                summary.outcome_label(),
                                summary.moves,
                                summary.strategy.label()
                            );
                        }
                        continue;
                    };
                    (err, describe(&summary))
                }
                Err(err) => (format!("{err:#}"), "run aborted".to_string()),
            };

            if self.verbose {
                println!(
                    "  ❌ Iteration {}/{} failed: {}",
                    i + 1,
                    iterations,
                    err.clone().red()
                );
                println!("     ↳ {context}");
            }
            outcome.failures.push(format!(
                "Iteration {} (strategy {}, seed {}): {} | {}",
                i + 1,
                plan.strategy.label(),
                iteration_seed,
                err,
                context
            ));
        }

        outcome
    }
}

#[derive(Debug, Default)]
struct IterationOutcome {
    successes: usize,
    failures: Vec<String>,
    best_score: Option<u32>,
    performance_data: Vec<Duration>,
}

fn evaluate_expectations(plan: &SimulationPlan, summary: &SimulationSummary) -> Option<String> {
    if let Some(violation) = summary.violations.first() {
        return Some(violation.clone());
    }
    for expectation in &plan.expectations {
        if let Err(err) = expectation.evaluate(summary) {
            return Some(err.to_string());
        }
    }
    None
}

fn describe(summary: &SimulationSummary) -> String {
    let view = &summary.final_view;
    format!(
        "{} (seed {}) {} | clock {} | points {} | moves {} | rejected {} | refused {}",
        summary.username,
        summary.seed,
        summary.outcome_label(),
        view.clock_text,
        view.cumulative_points,
        summary.moves,
        summary.rejected_actions,
        summary.refused_inputs
    )
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::scenario::get_scenario;

    #[tokio::test]
    async fn smoke_scenario_passes_for_every_seed() {
        let tester = LogicTester::new(TesterStorage::from_dir(None), false);
        let scenario = get_scenario("smoke").unwrap();
        let results = tester.run_scenario(&scenario, &[1, 2], 2).await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.passed), "{results:?}");
        assert_eq!(results[0].successful_iterations, 2);
        assert_eq!(results[0].best_score, Some(5_500 + 2 * 585 + 2_000));
    }

    #[test]
    fn durations_serialize_as_millis() {
        let result = ScenarioResult {
            scenario_name: "x".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            best_score: None,
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.performance_data, vec![Duration::from_millis(12)]);
    }
}
