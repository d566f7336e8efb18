pub const DEFAULT_LIMIT: i64 = 100;

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Caller-supplied values replace the defaults only when positive.
    pub fn resolve(limit: Option<i64>, offset: Option<i64>) -> Self {
        let defaults = Self::default();
        Self {
            limit: limit.filter(|l| *l > 0).unwrap_or(defaults.limit),
            offset: offset.filter(|o| *o > 0).unwrap_or(defaults.offset),
        }
    }

    /// Applies the window to an already ordered vector.
    pub fn slice<T>(&self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_for_missing_or_non_positive_values() {
        assert_eq!(Page::resolve(None, None), Page { limit: 100, offset: 0 });
        assert_eq!(Page::resolve(Some(0), Some(-3)), Page { limit: 100, offset: 0 });
        assert_eq!(Page::resolve(Some(-1), None).limit, 100);
    }

    #[test]
    fn positive_values_override() {
        assert_eq!(Page::resolve(Some(5), Some(10)), Page { limit: 5, offset: 10 });
    }

    #[test]
    fn slice_skips_then_takes() {
        let page = Page { limit: 2, offset: 1 };
        assert_eq!(page.slice(vec![1, 2, 3, 4]), vec![2, 3]);
        assert!(Page { limit: 2, offset: 9 }.slice(vec![1, 2]).is_empty());
    }
}
