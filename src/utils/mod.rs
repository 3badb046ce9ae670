use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
///
/// Engine diagnostics (fatal model errors, skipped transactions) are emitted
/// through `tracing`; set `RUST_LOG=projection_core=off` to silence them.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = "projection_core=info".parse() {
            filter = filter.add_directive(directive);
        }

        let _ = fmt().with_env_filter(filter).try_init();
    });
}

/// Rounds a money amount to two decimal places.
pub fn round_money(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Converts an annual percentage rate to the equivalent monthly growth factor.
pub fn monthly_factor(annual_percent: f64) -> f64 {
    (1.0 + annual_percent / 100.0).powf(1.0 / 12.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_cents() {
        assert_eq!(round_money(504.7441), 504.74);
        assert_eq!(round_money(1.009489), 1.01);
        assert_eq!(round_money(-0.001), 0.0);
    }

    #[test]
    fn twelve_monthly_factors_make_a_year() {
        let factor = monthly_factor(12.0);
        assert!((factor.powi(12) - 1.12).abs() < 1e-12);
        assert!((monthly_factor(0.0) - 1.0).abs() < f64::EPSILON);
    }
}
