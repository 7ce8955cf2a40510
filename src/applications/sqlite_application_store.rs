use super::models::{
    Applicant, Application, ApplicationFields, ApplicationSort, ApplicationStatus,
    CandidateApplication,
};
use super::store::ApplicationStore;
use crate::jobs::{job_from_row, JOB_COLUMNS};
use crate::sqlite_persistence::{
    is_unique_violation, lock_conn, parse_text_column, row_id, SharedConnection,
};
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use std::collections::HashSet;
use tracing::debug;

const APPLICATION_COLUMNS: &str = "a.id, a.user_id, a.job_id, a.cover_letter, a.resume, \
     a.qualification, a.phone, a.experience, a.status, a.applied_at";
const APPLICATION_COLUMN_COUNT: usize = 10;

fn application_from_row(row: &Row, offset: usize) -> rusqlite::Result<Application> {
    Ok(Application {
        id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        job_id: row.get(offset + 2)?,
        cover_letter: row.get(offset + 3)?,
        resume: row.get(offset + 4)?,
        qualification: row.get(offset + 5)?,
        phone: row.get(offset + 6)?,
        experience: row.get(offset + 7)?,
        status: parse_text_column(row, offset + 8)?,
        applied_at: row.get(offset + 9)?,
    })
}

/// Application columns followed by `u.username, u.email`.
fn applicant_from_row(row: &Row) -> rusqlite::Result<Applicant> {
    Ok(Applicant {
        application: application_from_row(row, 0)?,
        username: row.get(APPLICATION_COLUMN_COUNT)?,
        email: row.get(APPLICATION_COLUMN_COUNT + 1)?,
    })
}

#[derive(Clone)]
pub struct SqliteApplicationStore {
    conn: SharedConnection,
}

impl SqliteApplicationStore {
    pub fn new(conn: SharedConnection) -> Self {
        Self { conn }
    }
}

impl ApplicationStore for SqliteApplicationStore {
    fn create_application(
        &self,
        user_id: usize,
        job_id: usize,
        fields: &ApplicationFields,
        applied_at: i64,
    ) -> Result<Option<Application>> {
        let conn = lock_conn(&self.conn)?;
        let inserted = conn.execute(
            "INSERT INTO application (user_id, job_id, cover_letter, resume, qualification, \
             phone, experience, status, applied_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user_id,
                job_id,
                fields.cover_letter,
                fields.resume,
                fields.qualification,
                fields.phone,
                fields.experience,
                ApplicationStatus::Applied.as_str(),
                applied_at
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                debug!("User {} already applied to job {}", user_id, job_id);
                return Ok(None);
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to store application of {} to job {}", user_id, job_id)
                })
            }
        }

        Ok(Some(Application {
            id: conn.last_insert_rowid() as usize,
            user_id,
            job_id,
            cover_letter: fields.cover_letter.clone(),
            resume: fields.resume.clone(),
            qualification: fields.qualification.clone(),
            phone: fields.phone.clone(),
            experience: fields.experience.clone(),
            status: ApplicationStatus::Applied,
            applied_at,
        }))
    }

    fn get_application(&self, application_id: usize) -> Result<Option<Application>> {
        let Some(application_id) = row_id(application_id) else {
            return Ok(None);
        };
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM application a WHERE a.id = ?1",
                    APPLICATION_COLUMNS
                ),
                params![application_id],
                |row| application_from_row(row, 0),
            )
            .optional()?)
    }

    fn get_user_application(&self, user_id: usize, job_id: usize) -> Result<Option<Application>> {
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {} FROM application a WHERE a.user_id = ?1 AND a.job_id = ?2",
                    APPLICATION_COLUMNS
                ),
                params![user_id, job_id],
                |row| application_from_row(row, 0),
            )
            .optional()?)
    }

    fn update_application_fields(
        &self,
        application_id: usize,
        fields: &ApplicationFields,
    ) -> Result<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "UPDATE application SET qualification = ?1, phone = ?2, experience = ?3, \
             cover_letter = ?4, resume = COALESCE(?5, resume) WHERE id = ?6",
            params![
                fields.qualification,
                fields.phone,
                fields.experience,
                fields.cover_letter,
                fields.resume,
                application_id
            ],
        )?;
        Ok(())
    }

    fn set_application_status(
        &self,
        application_id: usize,
        status: ApplicationStatus,
    ) -> Result<()> {
        let conn = lock_conn(&self.conn)?;
        conn.execute(
            "UPDATE application SET status = ?1 WHERE id = ?2",
            params![status.as_str(), application_id],
        )?;
        Ok(())
    }

    fn applications_of_user(
        &self,
        user_id: usize,
        sort: ApplicationSort,
        limit: Option<usize>,
    ) -> Result<Vec<CandidateApplication>> {
        let order_by = match sort {
            ApplicationSort::Status => "a.status, a.applied_at DESC, a.id DESC",
            ApplicationSort::Recent => "a.applied_at DESC, a.id DESC",
        };
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, {} FROM application a JOIN job j ON j.id = a.job_id \
             WHERE a.user_id = ?1 ORDER BY {} LIMIT ?2",
            APPLICATION_COLUMNS, JOB_COLUMNS, order_by
        ))?;
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let applications = stmt
            .query_map(params![user_id, limit], |row| {
                Ok(CandidateApplication {
                    application: application_from_row(row, 0)?,
                    job: job_from_row(row, APPLICATION_COLUMN_COUNT)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(applications)
    }

    fn count_applications_of_user(&self, user_id: usize) -> Result<usize> {
        let conn = lock_conn(&self.conn)?;
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM application WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?)
    }

    fn applicants_of_job(&self, job_id: usize) -> Result<Vec<Applicant>> {
        let conn = lock_conn(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, u.username, u.email FROM application a JOIN user u ON u.id = a.user_id \
             WHERE a.job_id = ?1 AND a.status != ?2 ORDER BY a.applied_at DESC, a.id DESC",
            APPLICATION_COLUMNS
        ))?;
        let applicants = stmt
            .query_map(
                params![job_id, ApplicationStatus::Withdrawn.as_str()],
                applicant_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(applicants)
    }

    fn get_applicant(&self, application_id: usize) -> Result<Option<Applicant>> {
        let Some(application_id) = row_id(application_id) else {
            return Ok(None);
        };
        let conn = lock_conn(&self.conn)?;
        Ok(conn
            .query_row(
                &format!(
                    "SELECT {}, u.username, u.email FROM application a \
                     JOIN user u ON u.id = a.user_id WHERE a.id = ?1",
                    APPLICATION_COLUMNS
                ),
                params![application_id],
                applicant_from_row,
            )
            .optional()?)
    }

    fn applied_job_ids(&self, user_id: usize, job_ids: &[usize]) -> Result<HashSet<usize>> {
        if job_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let conn = lock_conn(&self.conn)?;
        let placeholders = vec!["?"; job_ids.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT job_id FROM application WHERE user_id = ? AND job_id IN ({})",
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{JobFields, JobStatus, JobStore, JobType, SqliteJobStore};
    use crate::sqlite_persistence::open_in_memory_database;

    struct Fixture {
        conn: SharedConnection,
        store: SqliteApplicationStore,
        jobs: SqliteJobStore,
        employer: usize,
    }

    fn insert_user(conn: &SharedConnection, username: &str, role: &str) -> usize {
        let conn = conn.lock().unwrap();
        conn.execute(
            "INSERT INTO user (username, email, created) VALUES (?1, ?2, 0)",
            params![username, format!("{}@example.com", username)],
        )
        .unwrap();
        let id = conn.last_insert_rowid() as usize;
        conn.execute(
            "INSERT INTO profile (user_id, role) VALUES (?1, ?2)",
            params![id, role],
        )
        .unwrap();
        id
    }

    fn setup() -> Fixture {
        let conn = open_in_memory_database().unwrap();
        let employer = insert_user(&conn, "acme", "employer");
        Fixture {
            store: SqliteApplicationStore::new(conn.clone()),
            jobs: SqliteJobStore::new(conn.clone()),
            conn,
            employer,
        }
    }

    impl Fixture {
        fn job(&self, title: &str) -> usize {
            self.jobs
                .create_job(
                    self.employer,
                    &JobFields {
                        title: title.to_string(),
                        company: "Acme".to_string(),
                        location: "Berlin".to_string(),
                        salary: None,
                        category: "IT".to_string(),
                        job_type: JobType::FullTime,
                        description: "A job".to_string(),
                        status: JobStatus::Open,
                    },
                    0,
                )
                .unwrap()
                .id
        }
    }

    fn fields(qualification: &str) -> ApplicationFields {
        ApplicationFields {
            qualification: qualification.to_string(),
            phone: "555".to_string(),
            experience: String::new(),
            cover_letter: None,
            resume: Some("applications/cv.pdf".to_string()),
        }
    }

    #[test]
    fn one_application_per_user_and_job() {
        let f = setup();
        let seeker = insert_user(&f.conn, "sam", "jobseeker");
        let job = f.job("Dev");

        let created = f
            .store
            .create_application(seeker, job, &fields("BSc"), 100)
            .unwrap()
            .unwrap();
        assert_eq!(created.status, ApplicationStatus::Applied);
        assert_eq!(f.store.get_application(created.id).unwrap(), Some(created.clone()));
        assert_eq!(
            f.store.get_user_application(seeker, job).unwrap(),
            Some(created)
        );

        assert!(f
            .store
            .create_application(seeker, job, &fields("MSc"), 200)
            .unwrap()
            .is_none());
        assert_eq!(f.store.count_applications_of_user(seeker).unwrap(), 1);
    }

    #[test]
    fn updating_fields_keeps_resume_unless_replaced() {
        let f = setup();
        let seeker = insert_user(&f.conn, "sam", "jobseeker");
        let job = f.job("Dev");
        let created = f
            .store
            .create_application(seeker, job, &fields("BSc"), 100)
            .unwrap()
            .unwrap();

        let mut update = fields("MSc");
        update.resume = None;
        update.cover_letter = Some("Hello".to_string());
        f.store.update_application_fields(created.id, &update).unwrap();

        let updated = f.store.get_application(created.id).unwrap().unwrap();
        assert_eq!(updated.qualification, "MSc");
        assert_eq!(updated.cover_letter.as_deref(), Some("Hello"));
        assert_eq!(updated.resume.as_deref(), Some("applications/cv.pdf"));
        assert_eq!(updated.applied_at, 100);

        f.store
            .set_application_status(created.id, ApplicationStatus::Interview)
            .unwrap();
        assert_eq!(
            f.store.get_application(created.id).unwrap().unwrap().status,
            ApplicationStatus::Interview
        );
    }

    #[test]
    fn candidate_listing_sorts() {
        let f = setup();
        let seeker = insert_user(&f.conn, "sam", "jobseeker");
        let first = f.job("First");
        let second = f.job("Second");
        let a = f
            .store
            .create_application(seeker, first, &fields("BSc"), 100)
            .unwrap()
            .unwrap();
        f.store
            .create_application(seeker, second, &fields("BSc"), 200)
            .unwrap()
            .unwrap();
        f.store
            .set_application_status(a.id, ApplicationStatus::Rejected)
            .unwrap();

        let recent = f
            .store
            .applications_of_user(seeker, ApplicationSort::Recent, None)
            .unwrap();
        assert_eq!(recent[0].job.title, "Second");
        assert_eq!(recent[1].application.status, ApplicationStatus::Rejected);

        // "Applied" sorts before "Rejected".
        let by_status = f
            .store
            .applications_of_user(seeker, ApplicationSort::Status, Some(1))
            .unwrap();
        assert_eq!(by_status.len(), 1);
        assert_eq!(by_status[0].application.status, ApplicationStatus::Applied);
    }

    #[test]
    fn applicants_exclude_withdrawn() {
        let f = setup();
        let sam = insert_user(&f.conn, "sam", "jobseeker");
        let kim = insert_user(&f.conn, "kim", "jobseeker");
        let job = f.job("Dev");
        let withdrawn = f
            .store
            .create_application(sam, job, &fields("BSc"), 100)
            .unwrap()
            .unwrap();
        f.store
            .create_application(kim, job, &fields("BSc"), 200)
            .unwrap()
            .unwrap();
        f.store
            .set_application_status(withdrawn.id, ApplicationStatus::Withdrawn)
            .unwrap();

        let applicants = f.store.applicants_of_job(job).unwrap();
        assert_eq!(applicants.len(), 1);
        assert_eq!(applicants[0].username, "kim");
        assert_eq!(applicants[0].email, "kim@example.com");
        assert_eq!(
            f.store.get_applicant(withdrawn.id).unwrap().unwrap().username,
            "sam"
        );

        assert_eq!(
            f.store.applied_job_ids(sam, &[job, job + 1]).unwrap(),
            HashSet::from([job])
        );
    }
}
