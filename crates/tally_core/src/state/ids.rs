use time::OffsetDateTime;

/// Identity and creation time handed to a newly created record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub id: String,
    pub created_at: OffsetDateTime,
}

pub trait IdSource {
    fn next_stamp(&mut self) -> Stamp;
}

/// Millisecond clock ids that never repeat: each id is strictly greater than
/// the previous one, even within a single millisecond or when the clock steps
/// backwards.
///
/// Once the numeric range is used up, ids continue as `<i64::MAX>-<n>`.
#[derive(Debug, Clone, Default)]
pub struct MonotonicIds {
    last: i64,
    overflow: u64,
}

impl MonotonicIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues after the largest numeric id in `existing`.
    pub fn seeded<'a, I>(existing: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut ids = Self::new();
        ids.observe(existing);
        ids
    }

    /// Makes sure later ids come after every id in `existing` this source
    /// could have produced.
    pub fn observe<'a, I>(&mut self, existing: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for id in existing {
            if let Ok(value) = id.parse::<i64>() {
                self.last = self.last.max(value);
            } else if let Some(suffix) = overflow_suffix(id) {
                self.last = i64::MAX;
                self.overflow = self.overflow.max(suffix);
            }
        }
    }

    fn next_after(&mut self, now: OffsetDateTime) -> String {
        let Some(after) = self.last.checked_add(1) else {
            self.overflow += 1;
            return format!("{}-{}", i64::MAX, self.overflow);
        };
        let millis = i64::try_from(now.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX);
        let next = millis.max(after);
        self.last = next;
        next.to_string()
    }
}

fn overflow_suffix(id: &str) -> Option<u64> {
    let (head, tail) = id.rsplit_once('-')?;
    if head.parse::<i64>().ok()? != i64::MAX {
        return None;
    }
    tail.parse().ok()
}

impl IdSource for MonotonicIds {
    fn next_stamp(&mut self) -> Stamp {
        let created_at = OffsetDateTime::now_utc();
        Stamp {
            id: self.next_after(created_at),
            created_at,
        }
    }
}

/// Deterministic ids `1, 2, 3, ...` with a fixed creation time.
#[derive(Debug, Clone)]
pub struct SequenceIds {
    next: u64,
    created_at: OffsetDateTime,
}

impl SequenceIds {
    pub fn new(created_at: OffsetDateTime) -> Self {
        Self {
            next: 1,
            created_at,
        }
    }
}

impl IdSource for SequenceIds {
    fn next_stamp(&mut self) -> Stamp {
        let id = self.next;
        self.next += 1;
        Stamp {
            id: id.to_string(),
            created_at: self.created_at,
        }
    }
}
