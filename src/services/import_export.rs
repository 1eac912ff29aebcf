//! Semicolon-delimited bulk import and export of the student/teacher/subject directory.

use std::collections::{HashMap, HashSet};

use crate::db::types::{ImportMode, Role};
use crate::repositories::store::{
    DirectoryCounts, EnrollmentFilter, EntityFilter, NewImportHistory, NewProfile, NewStudent,
    SurveyStore, TripleKey,
};
use crate::services::assignments::AssignmentResolver;
use crate::services::directory::split_name;
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::identity::IdentityProvider;

pub(crate) const IMPORT_HEADER: &str = "ZAK;EMAIL;HESLO;UCITEL;PREDMET";
pub(crate) const EXPORT_HEADER: &str = "ZAK;EMAIL;UCITEL;PREDMET";
const INSERT_CHUNK: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportRecord {
    pub(crate) student: String,
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) teacher: String,
    pub(crate) subject: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ImportStats {
    pub(crate) total_records: i32,
    pub(crate) new_students: i32,
    pub(crate) new_teachers: i32,
    pub(crate) new_subjects: i32,
    pub(crate) updated_records: i32,
    pub(crate) duplicates_skipped: i32,
    pub(crate) errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ImportOutcome {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) stats: ImportStats,
}

impl ImportOutcome {
    fn failed(message: String, mut stats: ImportStats, err: &ServiceError) -> Self {
        stats.errors.push(err.to_string());
        Self { success: false, message, stats }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses the import text. The header line and blank lines are skipped; a
/// malformed line is reported and left out of the returned records.
pub(crate) fn parse_records(data: &str) -> (Vec<ImportRecord>, Vec<String>) {
    let mut records = Vec::new();
    let mut errors = Vec::new();
    for (index, raw) in data.trim().lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || (index == 0 && line.to_uppercase().contains(IMPORT_HEADER)) {
            continue;
        }
        let parts: Vec<&str> = line.split(';').map(str::trim).collect();
        let [student, email, password, teacher, subject] = parts[..] else {
            errors.push(format!(
                "Invalid line format at line {}: \"{line}\". Expected 5 fields ({IMPORT_HEADER}), \
                 got {}",
                index + 1,
                parts.len()
            ));
            continue;
        };
        if student.is_empty() || teacher.is_empty() || subject.is_empty() {
            errors.push(format!(
                "Missing student, teacher or subject at line {}: \"{line}\"",
                index + 1
            ));
            continue;
        }
        records.push(ImportRecord {
            student: student.to_string(),
            email: non_empty(email),
            password: non_empty(password),
            teacher: teacher.to_string(),
            subject: subject.to_string(),
        });
    }
    (records, errors)
}

/// Students are matched by email, or by name when the row carries no email.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum StudentKey {
    Email(String),
    Name(String),
}

impl StudentKey {
    fn of(record: &ImportRecord) -> Self {
        match &record.email {
            Some(email) => Self::Email(email.clone()),
            None => Self::Name(record.student.clone()),
        }
    }
}

fn distinct<'r>(values: impl Iterator<Item = &'r String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values.filter(|value| seen.insert(value.as_str())).cloned().collect()
}

pub(crate) struct ImportExportService<'a> {
    store: &'a dyn SurveyStore,
    identity: &'a dyn IdentityProvider,
}

impl<'a> ImportExportService<'a> {
    pub(crate) fn new(store: &'a dyn SurveyStore, identity: &'a dyn IdentityProvider) -> Self {
        Self { store, identity }
    }

    /// Loads the records into the directory. Never fails outright: storage
    /// errors turn into an unsuccessful outcome carrying the stats so far.
    pub(crate) async fn import(
        &self,
        data: &str,
        mode: ImportMode,
        imported_by: &str,
    ) -> ImportOutcome {
        let mut stats = ImportStats::default();
        match self.run_import(data, mode, imported_by, &mut stats).await {
            Ok(()) => {
                let message = match mode {
                    ImportMode::Replace => "Data byla úspěšně nahrazena",
                    ImportMode::Add => "Data byla úspěšně přidána",
                };
                tracing::info!(
                    ?mode,
                    total = stats.total_records,
                    errors = stats.errors.len(),
                    "Import finished"
                );
                ImportOutcome { success: true, message: message.to_string(), stats }
            }
            Err(err) => ImportOutcome::failed(format!("Import failed: {err}"), stats, &err),
        }
    }

    async fn run_import(
        &self,
        data: &str,
        mode: ImportMode,
        imported_by: &str,
        stats: &mut ImportStats,
    ) -> ServiceResult<()> {
        let (records, parse_errors) = parse_records(data);
        stats.total_records = records.len() as i32;
        stats.errors.extend(parse_errors);

        if mode == ImportMode::Replace {
            self.clear().await?;
        }

        let student_ids = self.upsert_students(&records, stats).await?;
        let teacher_ids = self.upsert_teachers(&records, stats).await?;
        let subject_ids = self.upsert_subjects(&records, stats).await?;

        let existing = AssignmentResolver::new(self.store)
            .active_enrollments(&EnrollmentFilter::default())
            .await?;
        let mut known: HashSet<TripleKey> = existing.iter().map(TripleKey::of).collect();
        let mut fresh = Vec::new();
        for record in &records {
            let ids = (
                student_ids.get(&StudentKey::of(record)),
                teacher_ids.get(&record.teacher),
                subject_ids.get(&record.subject),
            );
            let (Some(student_id), Some(teacher_id), Some(subject_id)) = ids else {
                stats.errors.push(format!(
                    "Missing IDs for record: {}({})-{}-{}",
                    record.student,
                    record.email.as_deref().unwrap_or_default(),
                    record.teacher,
                    record.subject
                ));
                continue;
            };
            let key = TripleKey {
                student_id: Some(student_id.clone()),
                subject_id: subject_id.clone(),
                teacher_id: Some(teacher_id.clone()),
            };
            if known.insert(key.clone()) {
                fresh.push(key);
            } else {
                stats.duplicates_skipped += 1;
            }
        }

        for (batch, chunk) in fresh.chunks(INSERT_CHUNK).enumerate() {
            if let Err(err) = self.store.insert_enrollments(chunk).await {
                tracing::warn!(batch = batch + 1, error = %err, "Relationship batch failed");
                stats
                    .errors
                    .push(format!("Error inserting relationships batch {}: {err}", batch + 1));
            }
        }

        self.create_logins(&records, stats).await;

        self.store
            .insert_import_history(NewImportHistory {
                mode,
                total_records: stats.total_records,
                new_students: stats.new_students,
                new_teachers: stats.new_teachers,
                new_subjects: stats.new_subjects,
                duplicates_skipped: stats.duplicates_skipped,
                error_count: stats.errors.len() as i32,
                imported_by: Some(imported_by.to_string()),
            })
            .await
            .or_internal("record import history")?;
        Ok(())
    }

    async fn upsert_students(
        &self,
        records: &[ImportRecord],
        stats: &mut ImportStats,
    ) -> ServiceResult<HashMap<StudentKey, String>> {
        let (existing, _) = self
            .store
            .list_students(&EntityFilter::default(), None)
            .await
            .or_internal("load students")?;
        let mut ids = HashMap::new();
        for student in existing {
            if let Some(email) = &student.email {
                ids.insert(StudentKey::Email(email.clone()), student.id.clone());
            }
            ids.entry(StudentKey::Name(student.name)).or_insert(student.id);
        }

        let mut pending = Vec::new();
        let mut seen = HashSet::new();
        for record in records {
            let key = StudentKey::of(record);
            if !seen.insert(key.clone()) {
                continue;
            }
            if ids.contains_key(&key) {
                stats.updated_records += 1;
            } else {
                pending.push(NewStudent {
                    name: record.student.clone(),
                    email: record.email.clone(),
                });
            }
        }

        for chunk in pending.chunks(INSERT_CHUNK) {
            let created =
                self.store.insert_students(chunk.to_vec()).await.or_internal("create students")?;
            stats.new_students += created.len() as i32;
            for student in created {
                let key = match student.email {
                    Some(email) => StudentKey::Email(email),
                    None => StudentKey::Name(student.name),
                };
                ids.insert(key, student.id);
            }
        }
        Ok(ids)
    }

    async fn upsert_teachers(
        &self,
        records: &[ImportRecord],
        stats: &mut ImportStats,
    ) -> ServiceResult<HashMap<String, String>> {
        let (existing, _) = self
            .store
            .list_teachers(&EntityFilter::default(), None)
            .await
            .or_internal("load teachers")?;
        let mut ids: HashMap<String, String> =
            existing.into_iter().map(|teacher| (teacher.name, teacher.id)).collect();

        let names = distinct(records.iter().map(|record| &record.teacher));
        let (known, pending): (Vec<String>, Vec<String>) =
            names.into_iter().partition(|name| ids.contains_key(name));
        stats.updated_records += known.len() as i32;
        for chunk in pending.chunks(INSERT_CHUNK) {
            let created = self.store.insert_teachers(chunk).await.or_internal("create teachers")?;
            stats.new_teachers += created.len() as i32;
            ids.extend(created.into_iter().map(|teacher| (teacher.name, teacher.id)));
        }
        Ok(ids)
    }

    async fn upsert_subjects(
        &self,
        records: &[ImportRecord],
        stats: &mut ImportStats,
    ) -> ServiceResult<HashMap<String, String>> {
        let (existing, _) = self
            .store
            .list_subjects(&EntityFilter::default(), None)
            .await
            .or_internal("load subjects")?;
        let mut ids: HashMap<String, String> =
            existing.into_iter().map(|subject| (subject.name, subject.id)).collect();

        let names = distinct(records.iter().map(|record| &record.subject));
        let (known, pending): (Vec<String>, Vec<String>) =
            names.into_iter().partition(|name| ids.contains_key(name));
        stats.updated_records += known.len() as i32;
        for chunk in pending.chunks(INSERT_CHUNK) {
            let created = self.store.insert_subjects(chunk).await.or_internal("create subjects")?;
            stats.new_subjects += created.len() as i32;
            ids.extend(created.into_iter().map(|subject| (subject.name, subject.id)));
        }
        Ok(ids)
    }

    /// Creates a login and STUDENT profile for every imported student with an
    /// email and password that has no login yet. Failures are collected.
    async fn create_logins(&self, records: &[ImportRecord], stats: &mut ImportStats) {
        let mut seen = HashSet::new();
        for record in records {
            let (Some(email), Some(password)) = (&record.email, &record.password) else {
                continue;
            };
            if !seen.insert(email.to_lowercase()) {
                continue;
            }
            match self.identity.find_user_by_email(email).await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(err) => {
                    stats.errors.push(format!("Error processing auth for {email}: {err}"));
                    continue;
                }
            }
            let user = match self.identity.create_user(email, password).await {
                Ok(user) => user,
                Err(err) => {
                    stats.errors.push(format!("Failed to create auth user for {email}: {err}"));
                    continue;
                }
            };
            let (first_name, last_name) = split_name(&record.student);
            let profile = NewProfile {
                id: user.id,
                email: email.clone(),
                first_name: Some(first_name),
                last_name: Some(last_name),
                role: Role::Student,
            };
            if let Err(err) = self.store.insert_profile(profile).await {
                if !err.is_unique_violation() {
                    stats.errors.push(format!("Failed to create profile for {email}: {err}"));
                }
            }
        }
    }

    /// Removes every enrollment, student, teacher and subject, plus the logins
    /// and profiles of students that had an email. Returns the removed counts.
    async fn clear(&self) -> ServiceResult<DirectoryCounts> {
        let (students, _) = self
            .store
            .list_students(&EntityFilter::default(), None)
            .await
            .or_internal("load students")?;
        let counts = self.store.clear_directory().await.or_internal("clear directory")?;

        for email in students.iter().filter_map(|student| student.email.as_deref()) {
            match self.identity.find_user_by_email(email).await {
                Ok(Some(user)) => {
                    if let Err(err) = self.store.delete_profile(&user.id).await {
                        tracing::warn!(error = %err, "Failed to delete student profile");
                    }
                    if let Err(err) = self.identity.delete_user(&user.id).await {
                        tracing::warn!(error = %err, "Failed to delete student login");
                    }
                }
                Ok(None) => {}
                Err(err) => tracing::warn!(error = %err, "Failed to look up student login"),
            }
        }
        Ok(counts)
    }

    /// One line per active student enrollment, ordered by enrollment id.
    pub(crate) async fn export(&self) -> ServiceResult<String> {
        let rows = AssignmentResolver::new(self.store)
            .active_enrollments(&EnrollmentFilter::students_only())
            .await?;
        if rows.is_empty() {
            return Ok(format!("{EXPORT_HEADER}\n# No data to export"));
        }

        let student_ids = distinct(rows.iter().filter_map(|row| row.student_id.as_ref()));
        let teacher_ids = distinct(rows.iter().filter_map(|row| row.teacher_id.as_ref()));
        let subject_ids = distinct(rows.iter().map(|row| &row.subject_id));
        let (students, teachers, subjects) = tokio::try_join!(
            self.store.find_students_by_ids(&student_ids),
            self.store.find_teachers_by_ids(&teacher_ids),
            self.store.find_subjects_by_ids(&subject_ids),
        )
        .or_internal("load export names")?;
        let students: HashMap<_, _> = students.into_iter().map(|s| (s.id.clone(), s)).collect();
        let teachers: HashMap<_, _> = teachers.into_iter().map(|t| (t.id, t.name)).collect();
        let subjects: HashMap<_, _> = subjects.into_iter().map(|s| (s.id, s.name)).collect();

        let mut lines = vec![EXPORT_HEADER.to_string()];
        for row in &rows {
            let Some(student) = row.student_id.as_ref().and_then(|id| students.get(id)) else {
                continue;
            };
            let teacher = row.teacher_id.as_ref().and_then(|id| teachers.get(id));
            lines.push(format!(
                "{};{};{};{}",
                student.name,
                student.email.as_deref().unwrap_or_default(),
                teacher.map(String::as_str).unwrap_or_default(),
                subjects.get(&row.subject_id).map(String::as_str).unwrap_or_default(),
            ));
        }
        tracing::info!(rows = lines.len() - 1, "Directory exported");
        Ok(lines.join("\n"))
    }

    /// Wipes the directory and records the wipe in the import history.
    pub(crate) async fn delete_all(&self, deleted_by: &str) -> ImportOutcome {
        let stats = ImportStats::default();
        let result = async {
            let counts = self.clear().await?;
            self.store
                .insert_import_history(NewImportHistory {
                    mode: ImportMode::Replace,
                    total_records: 0,
                    new_students: 0,
                    new_teachers: 0,
                    new_subjects: 0,
                    duplicates_skipped: 0,
                    error_count: 0,
                    imported_by: Some(deleted_by.to_string()),
                })
                .await
                .or_internal("record import history")?;
            Ok::<_, ServiceError>(counts)
        }
        .await;

        match result {
            Ok(counts) => {
                tracing::info!(?counts, "Directory cleared");
                ImportOutcome {
                    success: true,
                    message: format!(
                        "Smazáno: {} vztahů, {} studentů, {} učitelů, {} předmětů",
                        counts.enrollments, counts.students, counts.teachers, counts.subjects
                    ),
                    stats,
                }
            }
            Err(err) => ImportOutcome::failed(format!("Mazání selhalo: {err}"), stats, &err),
        }
    }
}
