//! Composition of the public job search query.
//!
//! Only Open jobs are searchable. Text filters are case-insensitive substring
//! matches (SQLite `LIKE` with the wildcards of the user input escaped), all
//! filters are ANDed together, and every row carries its live application count.

use serde::{Deserialize, Serialize};

/// Jobs per search results page.
pub const PAGE_SIZE: usize = 9;

/// Columns of a job, selected from `job j`.
pub(crate) const JOB_COLUMNS: &str = "j.id, j.employer_id, j.title, j.company, j.description, \
     j.location, j.salary, j.category, j.job_type, j.status, j.posted_at";

/// The live application count of the job `j`.
pub(crate) const APPLICATION_COUNT: &str =
    "(SELECT COUNT(*) FROM application a WHERE a.job_id = j.id) AS application_count";

/// Raw query string parameters of the search page.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchParams {
    pub q: String,
    pub location: String,
    pub category: String,
    pub job_type: String,
    pub sort: String,
    pub remote_only: Option<String>,
    pub internships_only: Option<String>,
    pub entry_level_only: Option<String>,
    pub page: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Salary,
    Applications,
}

impl SortOrder {
    /// Unknown values fall back to newest first.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "salary" => SortOrder::Salary,
            "applications" => SortOrder::Applications,
            _ => SortOrder::Newest,
        }
    }

    fn order_by(&self) -> &'static str {
        match self {
            // Salary is free text, so this is a lexicographic sort.
            SortOrder::Salary => "j.salary DESC, j.id DESC",
            SortOrder::Applications => "application_count DESC, j.posted_at DESC, j.id DESC",
            SortOrder::Newest => "j.posted_at DESC, j.id DESC",
        }
    }
}

/// A query-string flag is on when present with a non-empty value.
fn flag(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn contains(value: &str) -> String {
    format!("%{}%", escape_like(value))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobSearch {
    pub q: String,
    pub location: String,
    pub category: String,
    pub job_type: String,
    pub remote_only: bool,
    pub internships_only: bool,
    pub entry_level_only: bool,
    pub sort: SortOrder,
}

impl JobSearch {
    pub fn from_params(params: &SearchParams) -> Self {
        Self {
            q: params.q.trim().to_string(),
            location: params.location.trim().to_string(),
            category: params.category.trim().to_string(),
            job_type: params.job_type.trim().to_string(),
            remote_only: flag(&params.remote_only),
            internships_only: flag(&params.internships_only),
            entry_level_only: flag(&params.entry_level_only),
            sort: SortOrder::parse(&params.sort),
        }
    }

    /// The WHERE clause and its positional parameters.
    fn filter(&self) -> (String, Vec<String>) {
        let mut conditions = vec!["j.status = 'Open'".to_string()];
        let mut params = vec![];

        if !self.q.is_empty() {
            let columns = ["j.title", "j.company", "j.description", "j.category"];
            let any = columns
                .iter()
                .map(|column| format!("{} LIKE ? ESCAPE '\\'", column))
                .collect::<Vec<_>>()
                .join(" OR ");
            conditions.push(format!("({})", any));
            params.extend(columns.iter().map(|_| contains(&self.q)));
        }
        if !self.location.is_empty() {
            conditions.push("j.location LIKE ? ESCAPE '\\'".to_string());
            params.push(contains(&self.location));
        }
        if !self.category.is_empty() {
            conditions.push("j.category LIKE ? ESCAPE '\\'".to_string());
            params.push(contains(&self.category));
        }
        if !self.job_type.is_empty() {
            // LIKE without wildcards is a case-insensitive equality.
            conditions.push("j.job_type LIKE ? ESCAPE '\\'".to_string());
            params.push(escape_like(&self.job_type));
        }
        if self.remote_only {
            conditions.push("j.job_type = 'Remote'".to_string());
        }
        if self.internships_only {
            conditions.push("j.job_type = 'Internship'".to_string());
        }
        if self.entry_level_only {
            conditions.push(
                "(j.category LIKE '%Fresher%' OR j.title LIKE '%Fresher%' \
                 OR j.title LIKE '%Junior%' OR j.title LIKE '%Entry%' \
                 OR j.description LIKE '%Entry level%')"
                    .to_string(),
            );
        }

        (conditions.join(" AND "), params)
    }

    pub fn count_query(&self) -> (String, Vec<String>) {
        let (filter, params) = self.filter();
        (format!("SELECT COUNT(*) FROM job j WHERE {}", filter), params)
    }

    /// Query for the 1-based `page` of results.
    pub fn page_query(&self, page: usize) -> (String, Vec<String>) {
        let (filter, params) = self.filter();
        let offset = page.saturating_sub(1) * PAGE_SIZE;
        (
            format!(
                "SELECT {}, {} FROM job j WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
                JOB_COLUMNS,
                APPLICATION_COUNT,
                filter,
                self.sort.order_by(),
                PAGE_SIZE,
                offset
            ),
            params,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub total: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, number: usize, total: usize) -> Self {
        let num_pages = num_pages(total);
        Self {
            items,
            number,
            num_pages,
            total,
            has_previous: number > 1,
            has_next: number < num_pages,
        }
    }
}

/// There is always at least one, possibly empty, page.
pub fn num_pages(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE).max(1)
}

/// Resolves the requested page number: anything that is not a number gives
/// the first page, numbers out of range give the last one.
pub fn resolve_page(requested: Option<&str>, num_pages: usize) -> usize {
    match requested.map(str::trim).and_then(|p| p.parse::<i64>().ok()) {
        None => 1,
        Some(n) if n < 1 => num_pages,
        Some(n) => (n as usize).min(num_pages),
    }
}
