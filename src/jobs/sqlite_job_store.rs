use super::job_store::JobStore;
use super::models::{
    CategoryApplicationCount, EmployerAnalytics, Job, JobApplicationCount, JobFields, JobListing,
    MonthlyPostings, SavedJob,
};
use super::search::{num_pages, resolve_page, JobSearch, Page, APPLICATION_COUNT, JOB_COLUMNS};
use crate::sqlite_persistence::{lock_conn, parse_text_column, row_id, SharedConnection};
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::collections::HashSet;
use tracing::debug;

/// Number of columns in [`JOB_COLUMNS`].
pub(crate) const JOB_COLUMN_COUNT: usize = 11;

/// Maps the [`JOB_COLUMNS`] starting at `offset`.
pub(crate) fn job_from_row(row: &Row, offset: usize) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(offset)?,
        employer_id: row.get(offset + 1)?,
        title: row.get(offset + 2)?,
        company: row.get(offset + 3)?,
        description: row.get(offset + 4)?,
        location: row.get(offset + 5)?,
        salary: row.get(offset + 6)?,
        category: row.get(offset + 7)?,
        job_type: parse_text_column(row, offset + 8)?,
        status: parse_text_column(row, offset + 9)?,
        posted_at: row.get(offset + 10)?,
    })
}

fn listing_from_row(row: &Row) -> rusqlite::Result<JobListing> {
    Ok(JobListing {
        job: job_from_row(row, 0)?,
        application_count: row.get(JOB_COLUMN_COUNT)?,
    })
}

/// SQLite backed job catalog, including the per-user saved jobs.
#[derive(Clone)]
pub struct SqliteJobStore {
    conn: SharedConnection,
}

impl SqliteJobStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }

    fn listings(&self, filter: &str, order_and_limit: &str, values: &[i64]) -> Result<Vec<JobListing>> {
        let conn = lock_conn(&self.conn)?;
        let sql = format!(
            "SELECT {}, {} FROM job j WHERE {} {}",
            JOB_COLUMNS, APPLICATION_COUNT, filter, order_and_limit
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), listing_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

impl JobStore for SqliteJobStore {
    fn create_job(&self, employer_id: usize, fields: &JobFields, posted_at: i64) -> Result<Job> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "INSERT INTO job (employer_id, title, company, description, location, salary, \
             category, job_type, status, posted_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                employer_id,
                fields.title,
                fields.company,
                fields.description,
                fields.location,
                fields.salary,
                fields.category,
                fields.job_type.as_str(),
                fields.status.as_str(),
                posted_at
            ],
        )
        .with_context(|| format!("Failed to create job for employer {}", employer_id))?;
        let id = conn.last_insert_rowid() as usize;
        debug!("Created job {} for employer {}", id, employer_id);

        Ok(Job {
            id,
            employer_id,
            title: fields.title.clone(),
            company: fields.company.clone(),
            description: fields.description.clone(),
            location: fields.location.clone(),
            salary: fields.salary.clone(),
            category: fields.category.clone(),
            job_type: fields.job_type,
            status: fields.status,
            posted_at,
        })
    }

    fn get_job(&self, job_id: usize) -> Result<Option<Job>> {
        let Some(job_id) = row_id(job_id) else {
            return Ok(None);
        };
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM job j WHERE j.id = ?1", JOB_COLUMNS),
                params![job_id],
                |row| job_from_row(row, 0),
            )
            .optional()?)
    }

    fn get_job_listing(&self, job_id: usize) -> Result<Option<JobListing>> {
        let Some(job_id) = row_id(job_id) else {
            return Ok(None);
        };
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {}, {} FROM job j WHERE j.id = ?1",
                    JOB_COLUMNS, APPLICATION_COUNT
                ),
                params![job_id],
                listing_from_row,
            )
            .optional()?)
    }

    fn get_employer_job(&self, job_id: usize, employer_id: usize) -> Result<Option<Job>> {
        Ok(self
            .get_job(job_id)?
            .filter(|job| job.employer_id == employer_id))
    }

    fn update_job(&self, job_id: usize, employer_id: usize, fields: &JobFields) -> Result<bool> {
        let Some(job_id) = row_id(job_id) else {
            return Ok(false);
        };
        let conn = lock_conn(&self.conn)?;
        let updated = conn.execute(
            "UPDATE job SET title = ?1, company = ?2, description = ?3, location = ?4, \
             salary = ?5, category = ?6, job_type = ?7, status = ?8 \
             WHERE id = ?9 AND employer_id = ?10",
            params![
                fields.title,
                fields.company,
                fields.description,
                fields.location,
                fields.salary,
                fields.category,
                fields.job_type.as_str(),
                fields.status.as_str(),
                job_id,
                employer_id
            ],
        )?;
        Ok(updated > 0)
    }

    fn delete_job(&self, job_id: usize, employer_id: usize) -> Result<bool> {
        let Some(job_id) = row_id(job_id) else {
            return Ok(false);
        };
        let conn = lock_conn(&self.conn)?;
        let deleted = conn.execute(
            "DELETE FROM job WHERE id = ?1 AND employer_id = ?2",
            params![job_id, employer_id],
        )?;
        if deleted > 0 {
            debug!("Deleted job {} of employer {}", job_id, employer_id);
        }
        Ok(deleted > 0)
    }

    fn search_jobs(&self, search: &JobSearch, page: Option<&str>) -> Result<Page<JobListing>> {
        let conn = lock_conn(&self.conn)?;

        let (count_sql, values) = search.count_query();
        let total: usize = conn.query_row(&count_sql, params_from_iter(values.iter()), |row| {
            row.get(0)
        })?;
        let number = resolve_page(page, num_pages(total));

        let (page_sql, values) = search.page_query(number);
        let mut stmt = conn.prepare(&page_sql)?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), listing_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(Page::new(items, number, total))
    }

    fn latest_jobs(&self, limit: usize) -> Result<Vec<JobListing>> {
        self.listings(
            "j.status = 'Open'",
            "ORDER BY j.posted_at DESC, j.id DESC LIMIT ?1",
            &[limit as i64],
        )
    }

    fn categories(&self, limit: usize) -> Result<Vec<String>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT category FROM job WHERE status = 'Open' AND category != '' \
             ORDER BY category LIMIT ?1",
        )?;
        let categories = stmt
            .query_map(params![limit], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(categories)
    }

    fn employer_jobs(&self, employer_id: usize) -> Result<Vec<JobListing>> {
        self.listings(
            "j.employer_id = ?1",
            "ORDER BY j.posted_at DESC, j.id DESC",
            &[employer_id as i64],
        )
    }

    fn open_jobs_of_employer(&self, employer_id: usize) -> Result<Vec<JobListing>> {
        self.listings(
            "j.employer_id = ?1 AND j.status = 'Open'",
            "ORDER BY j.posted_at DESC, j.id DESC",
            &[employer_id as i64],
        )
    }

    fn employer_analytics(&self, employer_id: usize) -> Result<EmployerAnalytics> {
        let conn = lock_conn(&self.conn)?;

        let mut stmt = conn.prepare(
            "SELECT strftime('%Y-%m', posted_at, 'unixepoch') AS month, COUNT(*) \
             FROM job WHERE employer_id = ?1 GROUP BY month ORDER BY month",
        )?;
        let jobs_per_month = stmt
            .query_map(params![employer_id], |row| {
                Ok(MonthlyPostings {
                    month: row.get(0)?,
                    total: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT j.id, j.title, COUNT(a.id) AS total \
             FROM application a JOIN job j ON j.id = a.job_id \
             WHERE j.employer_id = ?1 GROUP BY j.id, j.title ORDER BY total DESC, j.id",
        )?;
        let applications_per_job = stmt
            .query_map(params![employer_id], |row| {
                Ok(JobApplicationCount {
                    job_id: row.get(0)?,
                    title: row.get(1)?,
                    total: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT j.category, COUNT(a.id) AS total \
             FROM application a JOIN job j ON j.id = a.job_id \
             WHERE j.employer_id = ?1 GROUP BY j.category ORDER BY total DESC, j.category",
        )?;
        let applications_per_category = stmt
            .query_map(params![employer_id], |row| {
                Ok(CategoryApplicationCount {
                    category: row.get(0)?,
                    total: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(EmployerAnalytics {
            jobs_per_month,
            applications_per_job,
            applications_per_category,
        })
    }

    fn recommended_jobs(&self, user_id: usize, limit: usize) -> Result<Vec<JobListing>> {
        let applied: usize = {
            let conn = lock_conn(&self.conn)?;
            conn.query_row(
                "SELECT COUNT(*) FROM application WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?
        };
        if applied == 0 {
            return self.latest_jobs(limit);
        }

        self.listings(
            "j.status = 'Open' \
             AND j.id NOT IN (SELECT job_id FROM application WHERE user_id = ?1) \
             AND (j.category IN (SELECT aj.category FROM application ua \
                                 JOIN job aj ON aj.id = ua.job_id WHERE ua.user_id = ?1) \
                  OR j.job_type IN (SELECT aj.job_type FROM application ua \
                                    JOIN job aj ON aj.id = ua.job_id WHERE ua.user_id = ?1))",
            "ORDER BY j.posted_at DESC, j.id DESC LIMIT ?2",
            &[user_id as i64, limit as i64],
        )
    }

    fn toggle_saved_job(&self, user_id: usize, job_id: usize, at: i64) -> Result<bool> {
        let mut conn = lock_conn(&self.conn)?;
        let tx = conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM saved_job WHERE user_id = ?1 AND job_id = ?2",
            params![user_id, job_id],
        )?;
        if removed == 0 {
            tx.execute(
                "INSERT INTO saved_job (user_id, job_id, created) VALUES (?1, ?2, ?3)",
                params![user_id, job_id, at],
            )?;
        }
        tx.commit()?;
        Ok(removed == 0)
    }

    fn saved_jobs(&self, user_id: usize, limit: Option<usize>) -> Result<Vec<SavedJob>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, s.created FROM saved_job s JOIN job j ON j.id = s.job_id \
             WHERE s.user_id = ?1 ORDER BY s.created DESC, s.id DESC LIMIT ?2",
            JOB_COLUMNS
        ))?;
        // A negative LIMIT means no limit in SQLite.
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let saved = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(SavedJob {
                    job: job_from_row(row, 0)?,
                    saved_at: row.get(JOB_COLUMN_COUNT)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(saved)
    }

    fn count_saved_jobs(&self, user_id: usize) -> Result<usize> {
        let conn = lock_conn(&self.conn)?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM saved_job WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    fn saved_job_ids(&self, user_id: usize, job_ids: &[usize]) -> Result<HashSet<usize>> {
        if job_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let conn = lock_conn(&self.conn)?;
        let placeholders = vec!["?"; job_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT job_id FROM saved_job WHERE user_id = ? AND job_id IN ({})",
            placeholders
        ))?;
        let ids = stmt
            .query_map(
                params_from_iter(std::iter::once(user_id).chain(job_ids.iter().copied())),
                |row| row.get(0),
            )?
            .collect::<rusqlite::Result<HashSet<usize>>>()?;
        Ok(ids)
    }
}
