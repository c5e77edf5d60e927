use chrono::NaiveDate;

/// The rotating bonus phrase. At most one row is active at a time; posts
/// dated before `active_on` never qualify even when their text matches.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KeywordOfDay {
    pub keyword: String,
    pub active_on: NaiveDate,
    pub points: i64,
    pub active: bool,
}

impl KeywordOfDay {
    pub fn matches(&self, body: &str) -> bool {
        body.to_lowercase().contains(&self.keyword.to_lowercase())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn keyword_match_is_case_insensitive() {
        let kw = KeywordOfDay {
            keyword: "WAGMI".to_string(),
            active_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            points: 10,
            active: true,
        };
        assert!(kw.matches("gm frens, wagmi today"));
        assert!(kw.matches("WaGmI"));
        assert!(!kw.matches("ngmi"));
    }
}
