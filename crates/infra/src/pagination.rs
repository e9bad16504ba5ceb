#[derive(Debug, Clone, Copy)]
pub struct LimitOffset {
    pub limit: i64,
    pub offset: i64,
}

impl LimitOffset {
    /// Clamp caller-supplied paging so discovery queries stay bounded.
    pub fn clamped(limit: Option<i64>, offset: Option<i64>) -> Self {
        let d = Self::default();
        Self {
            limit: limit.unwrap_or(d.limit).clamp(1, 100),
            offset: offset.unwrap_or(0).max(0),
        }
    }
}

impl Default for LimitOffset {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}
