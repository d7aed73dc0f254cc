//! Prompt templates for the five analytical roles and the consensus pass.
//!
//! Every prompt demands a bare JSON object reply; the parser still tolerates
//! fenced or prefixed output.

use wyckoff_models::Role;

const REPLY_CONTRACT: &str = "\
Reply with a single JSON object and nothing else. Required fields: \
\"signal\" (one of \"bullish\", \"bearish\", \"neutral\", \"avoid\"), \
\"confidence\" (integer 0-100), \"reason\" (one short paragraph). \
Add any role-specific findings as additional top-level fields.";

/// System prompt framing one role's analytical mandate.
pub fn system_prompt(role: Role) -> String {
    let mandate = match role {
        Role::PhaseHunter => {
            "You are a Wyckoff phase analyst. Identify the current Wyckoff phase \
             (accumulation, markup, distribution, markdown, and sub-phase A-E) from \
             price structure and the trading range. Report the phase in a \"phase\" \
             field and key range boundaries in \"key_levels\"."
        }
        Role::VolumeDetective => {
            "You are a volume analyst. Judge effort versus result: compare volume \
             surges to price progress, flag absorption, no-demand and no-supply \
             bars, and read the fund flow data for institutional footprints. Report \
             notable bars in a \"volume_events\" field."
        }
        Role::SpringHunter => {
            "You are a spring and upthrust analyst. Search the recent range for \
             springs, shakeouts, upthrusts and their tests. Judge whether a \
             terminal shakeout has completed. Report detected events in a \
             \"structures\" field with dates and prices."
        }
        Role::TargetEngineer => {
            "You are a price target analyst. Derive targets from the trading \
             range using cause-and-effect projection, and place protective stops \
             under the relevant support. Report \"target_price\" and \"stop_loss\" \
             fields with concrete prices."
        }
        Role::StrengthCommander => {
            "You are a relative strength analyst. Compare the subject against its \
             benchmark index data: leadership on rallies, resilience on declines, \
             divergences at range extremes. Report a \"relative_strength\" field \
             summarizing the comparison."
        }
    };

    format!("{mandate}\n\n{REPLY_CONTRACT}")
}

/// System prompt for the consensus pass over the five role records.
pub fn chief_strategist_prompt() -> String {
    format!(
        "You are the chief strategist. You receive five JSON records from \
         specialist Wyckoff analysts. Weigh them into one verdict, favoring \
         agreement between phase and volume over any single outlier, and \
         discounting records that report a failure reason. \
         Reply with a single JSON object and nothing else. Required fields: \
         \"signal\" (one of \"bullish\", \"bearish\", \"neutral\", \"avoid\"), \
         \"strength\" (\"strong\", \"moderate\" or \"weak\"), \"stop_loss\", \
         \"target_price\", \"position\" (suggested position size), \
         \"confidence\" (integer 0-100), \"reason\" (one short paragraph)."
    )
}

/// User prompt carrying the datasets for one role invocation.
pub fn role_user_prompt(
    code: &str,
    daily_bars: &str,
    fund_flow: Option<&str>,
    stock_info: Option<&str>,
    benchmark_bars: Option<&str>,
) -> String {
    let mut prompt = format!("Subject: {code}\n\nDaily bars:\n{daily_bars}\n");
    if let Some(flow) = fund_flow {
        prompt.push_str(&format!("\nFund flow:\n{flow}\n"));
    }
    if let Some(info) = stock_info {
        prompt.push_str(&format!("\nStock info:\n{info}\n"));
    }
    if let Some(bars) = benchmark_bars {
        prompt.push_str(&format!("\nBenchmark index bars:\n{bars}\n"));
    }
    prompt
}
