use time::OffsetDateTime;
use time::macros::format_description;

/// Time periods for log rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RotationPeriod {
    /// Never rotate on time.
    Never,
    /// Rotate every hour.
    Hourly,
    /// Rotate every day.
    #[default]
    Daily,
    /// Rotate every week, starting on Monday.
    Weekly,
    /// Rotate every month.
    Monthly,
}

impl RotationPeriod {
    /// Key naming the period that contains `at`.
    ///
    /// Two instants belong to the same period exactly when their keys are
    /// equal. The key doubles as the archive suffix, e.g. `app.log.2026-01-09`.
    pub fn key(&self, at: OffsetDateTime) -> String {
        let formatted = match self {
            Self::Never => return String::new(),
            Self::Hourly => at.format(format_description!("[year]-[month]-[day]T[hour]")),
            Self::Daily => at.format(format_description!("[year]-[month]-[day]")),
            Self::Weekly => {
                let monday =
                    at - time::Duration::days(at.weekday().number_days_from_monday() as i64);
                monday.format(format_description!("[year]-[month]-[day]"))
            }
            Self::Monthly => at.format(format_description!("[year]-[month]")),
        };
        // Formatting these descriptions only fails for out-of-range years.
        formatted.unwrap_or_default()
    }
}

/// When and how a log file is rolled over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Roll when the period changes.
    pub period: RotationPeriod,
    /// Roll when a write would grow the file past this many bytes.
    pub max_size: Option<u64>,
    /// Archives to keep; 0 keeps all of them.
    pub max_files: usize,
    /// Gzip archives on a background thread.
    pub compress: bool,
}

impl RotationPolicy {
    /// Daily rotation with compressed archives, nothing pruned.
    pub fn daily() -> Self {
        Self {
            period: RotationPeriod::Daily,
            max_size: None,
            max_files: 0,
            compress: true,
        }
    }

    pub fn with_period(mut self, period: RotationPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = Some(max_size);
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Whether a write of `incoming` bytes must go to a fresh file.
    pub(crate) fn needs_roll(
        &self,
        current_key: &str,
        now_key: &str,
        size: u64,
        incoming: usize,
    ) -> bool {
        let period_changed = self.period != RotationPeriod::Never && current_key != now_key;
        let too_big = match self.max_size {
            Some(max) => size > 0 && size + incoming as u64 > max,
            None => false,
        };
        period_changed || too_big
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::daily()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_period_keys() {
        let at = datetime!(2026-01-15 13:45 UTC);
        assert_eq!(RotationPeriod::Never.key(at), "");
        assert_eq!(RotationPeriod::Hourly.key(at), "2026-01-15T13");
        assert_eq!(RotationPeriod::Daily.key(at), "2026-01-15");
        // 2026-01-15 is a Thursday.
        assert_eq!(RotationPeriod::Weekly.key(at), "2026-01-12");
        assert_eq!(RotationPeriod::Monthly.key(at), "2026-01");
    }

    #[test]
    fn test_same_period_same_key() {
        let morning = datetime!(2026-03-02 00:00 UTC);
        let night = datetime!(2026-03-02 23:59 UTC);
        let next = datetime!(2026-03-03 00:00 UTC);
        let daily = RotationPeriod::Daily;
        assert_eq!(daily.key(morning), daily.key(night));
        assert_ne!(daily.key(night), daily.key(next));
    }

    #[test]
    fn test_default_policy() {
        let policy = RotationPolicy::default();
        assert_eq!(policy.period, RotationPeriod::Daily);
        assert_eq!(policy.max_size, None);
        assert_eq!(policy.max_files, 0);
        assert!(policy.compress);
    }

    #[test]
    fn test_needs_roll() {
        let policy = RotationPolicy::daily().with_max_size(100);
        assert!(!policy.needs_roll("2026-01-01", "2026-01-01", 10, 10));
        assert!(policy.needs_roll("2026-01-01", "2026-01-02", 10, 10));
        assert!(policy.needs_roll("2026-01-01", "2026-01-01", 95, 10));
        // An oversized first line still lands in an empty file.
        assert!(!policy.needs_roll("2026-01-01", "2026-01-01", 0, 500));

        let never = RotationPolicy::daily().with_period(RotationPeriod::Never);
        assert!(!never.needs_roll("", "", 1 << 40, 10));
    }
}
