use anyhow::{Context, Result, bail};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse CLI seed tokens, keeping first-seen order and dropping repeats.
///
/// Negative integers map to their magnitude so `-7` and `7` replay the same run.
pub fn parse_seeds(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    for token in tokens {
        let seed = if let Some(digits) = token.strip_prefix('-') {
            digits
                .parse::<u64>()
                .with_context(|| format!("invalid seed '{token}'"))?
        } else {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed '{token}'"))?
        };
        if !seeds.contains(&seed) {
            seeds.push(seed);
        }
    }
    if seeds.is_empty() {
        bail!("at least one seed is required");
    }
    Ok(seeds)
}
