/// User ids are the opaque string ids issued by the external auth provider.
pub type UserId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A calendar day with no time-of-day component. Streak comparisons operate
/// on these, in whatever timezone the caller resolved "today" in.
pub type CalendarDate = chrono::NaiveDate;
