use std::collections::HashSet;

use super::{DirectoryService, StudentListing, StudentSubject, STUDENT_NOT_FOUND};
use crate::db::models::Student;
use crate::db::types::Role;
use crate::repositories::store::{
    EnrollmentFilter, EnrollmentOwner, EntityFilter, NewProfile, NewStudent, ProfilePatch,
    StudentPatch, TripleKey,
};
use crate::services::error::{OrInternal, ServiceError, ServiceResult};
use crate::services::pagination::{page_window, Paginated, ITEMS_PER_PAGE};
use crate::services::saga::Saga;

#[derive(Debug, Clone)]
pub(crate) struct StudentAssignmentInput {
    pub(crate) subject_id: String,
    pub(crate) teacher_id: Option<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct CreateStudentInput {
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) assignments: Vec<StudentAssignmentInput>,
}

#[derive(Debug, Clone)]
pub(crate) struct UpdateStudentInput {
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) assignments: Option<Vec<StudentAssignmentInput>>,
}

/// First word and the remainder of a full name.
pub(crate) fn split_name(name: &str) -> (String, String) {
    let mut words = name.split(' ');
    let first = words.next().unwrap_or_default().to_string();
    let rest = words.collect::<Vec<_>>().join(" ");
    (first, rest)
}

fn student_not_found() -> ServiceError {
    ServiceError::NotFound(STUDENT_NOT_FOUND.to_string())
}

fn duplicate_name(name: &str) -> ServiceError {
    ServiceError::Conflict(format!("Student se jménem \"{name}\" již existuje"))
}

fn duplicate_email(email: &str) -> ServiceError {
    ServiceError::Conflict(format!("Student s emailem \"{email}\" již existuje"))
}

fn account_creation_failed(err: impl std::fmt::Display) -> ServiceError {
    ServiceError::Validation(format!("Nepodařilo se vytvořit autentizační účet: {err}"))
}

fn keys_for(student_id: &str, assignments: &[StudentAssignmentInput]) -> Vec<TripleKey> {
    assignments
        .iter()
        .map(|assignment| TripleKey {
            student_id: Some(student_id.to_string()),
            subject_id: assignment.subject_id.clone(),
            teacher_id: assignment.teacher_id.clone().filter(|id| !id.is_empty()),
        })
        .collect()
}

fn student_profile(id: String, email: &str, name: &str) -> NewProfile {
    let (first_name, last_name) = split_name(name);
    NewProfile {
        id,
        email: email.to_string(),
        first_name: Some(first_name),
        last_name: Some(last_name),
        role: Role::Student,
    }
}

impl<'a> DirectoryService<'a> {
    /// Students by name. `teacher_filter` and `subject_filter` match names of the
    /// teachers and subjects on a student's active rows; both must match.
    pub(crate) async fn list_students(
        &self,
        index: i32,
        name_filter: Option<String>,
        teacher_filter: Option<String>,
        subject_filter: Option<String>,
    ) -> ServiceResult<Paginated<StudentListing>> {
        let page = page_window(index, ITEMS_PER_PAGE);
        let teacher_filter = teacher_filter.filter(|needle| !needle.is_empty());
        let subject_filter = subject_filter.filter(|needle| !needle.is_empty());

        let mut allowed: Option<HashSet<String>> = None;
        if let Some(needle) = teacher_filter.as_deref() {
            let filter = EnrollmentFilter {
                teacher_ids: Some(self.teacher_ids_named(needle).await?),
                require_student: true,
                ..EnrollmentFilter::default()
            };
            let rows = self.resolver().active_enrollments(&filter).await?;
            allowed = Some(rows.into_iter().filter_map(|row| row.student_id).collect());
        }
        if let Some(needle) = subject_filter.as_deref() {
            let subject_ids = self.subject_ids_named(needle).await?;
            let rows = self.active_rows_for_subjects(&subject_ids, true).await?;
            let matching: HashSet<String> =
                rows.into_iter().filter_map(|row| row.student_id).collect();
            allowed = Some(match allowed {
                Some(previous) => previous.intersection(&matching).cloned().collect(),
                None => matching,
            });
        }
        if allowed.as_ref().is_some_and(HashSet::is_empty) {
            return Ok(Paginated::new(Vec::new(), 0, page));
        }

        let filter = EntityFilter {
            name: name_filter,
            ids: allowed.map(|ids| ids.into_iter().collect()),
        };
        let (students, total) =
            self.store.list_students(&filter, Some(page)).await.or_internal("fetch students")?;
        let items = self.describe_students(students).await?;
        Ok(Paginated::new(items, total, page))
    }

    async fn describe_students(
        &self,
        students: Vec<Student>,
    ) -> ServiceResult<Vec<StudentListing>> {
        if students.is_empty() {
            return Ok(Vec::new());
        }
        let filter = EnrollmentFilter {
            student_ids: Some(students.iter().map(|student| student.id.clone()).collect()),
            ..EnrollmentFilter::default()
        };
        let rows = self.resolver().active_enrollments(&filter).await?;
        let (subjects, teachers) = self.parties(&rows).await?;

        Ok(students
            .into_iter()
            .map(|student| {
                let subjects = rows
                    .iter()
                    .filter(|row| row.student_id.as_deref() == Some(student.id.as_str()))
                    .filter_map(|row| {
                        Some(StudentSubject {
                            subject: subjects.get(&row.subject_id)?.clone(),
                            teacher: row
                                .teacher_id
                                .as_ref()
                                .and_then(|id| teachers.get(id))
                                .cloned(),
                        })
                    })
                    .collect();
                StudentListing { student, subjects }
            })
            .collect())
    }

    async fn find_student(&self, id: &str) -> ServiceResult<Student> {
        self.store
            .find_students_by_ids(&[id.to_string()])
            .await
            .or_internal("load student")?
            .into_iter()
            .next()
            .ok_or_else(student_not_found)
    }

    async fn student_listing(&self, student: Student) -> ServiceResult<StudentListing> {
        self.describe_students(vec![student]).await?.pop().ok_or_else(student_not_found)
    }

    /// Creates the student, its enrollment rows and, with email and password, a
    /// login. Any failure after the insert removes everything created so far.
    pub(crate) async fn create_student(
        &self,
        input: CreateStudentInput,
    ) -> ServiceResult<StudentListing> {
        let email = input.email.filter(|email| !email.is_empty());
        if let Some(email) = email.as_deref() {
            let taken =
                self.store.find_student_by_email(email).await.or_internal("check student")?;
            if taken.is_some() {
                return Err(duplicate_email(email));
            }
        }
        let taken =
            self.store.find_student_by_name(&input.name).await.or_internal("check student")?;
        if taken.is_some() {
            return Err(duplicate_name(&input.name));
        }

        let student = self
            .store
            .insert_students(vec![NewStudent { name: input.name.clone(), email: email.clone() }])
            .await
            .or_internal("create student")?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal("Failed to create student".to_string()))?;

        let mut saga = Saga::new("create_student");
        let store = self.store;
        let student_id = student.id.clone();
        saga.on_rollback("delete student", move || async move {
            store.delete_students(&[student_id]).await.map(|_| ())
        });

        let keys = keys_for(&student.id, &input.assignments);
        if !keys.is_empty() {
            saga.run("create assignments", self.store.insert_enrollments(&keys))
                .await
                .or_internal("create assignments")?;
        }

        if let (Some(email), Some(password)) = (email.as_deref(), input.password.as_deref()) {
            let existing = saga
                .run("check login", self.identity.find_user_by_email(email))
                .await
                .map_err(account_creation_failed)?;
            if existing.is_some() {
                saga.rollback().await;
                return Err(ServiceError::Conflict(format!(
                    "Uživatel s emailem {email} již existuje v systému"
                )));
            }

            let user = saga
                .run("create login", self.identity.create_user(email, password))
                .await
                .map_err(account_creation_failed)?;
            let identity = self.identity;
            let user_id = user.id.clone();
            saga.on_rollback("delete login", move || async move {
                identity.delete_user(&user_id).await.map(|_| ())
            });

            saga.run(
                "create profile",
                self.store.insert_profile(student_profile(user.id, email, &student.name)),
            )
            .await
            .map_err(account_creation_failed)?;
        }
        saga.commit();

        tracing::info!(student_id = %student.id, rows = keys.len(), "Student created");
        self.student_listing(student).await
    }

    /// Updates name and email, keeps the login in step with them, and replaces the
    /// active rows when `assignments` is given. A failed login update restores
    /// the previous name and email.
    pub(crate) async fn update_student(
        &self,
        id: &str,
        input: UpdateStudentInput,
    ) -> ServiceResult<StudentListing> {
        let existing = self.find_student(id).await?;

        let taken =
            self.store.find_student_by_name(&input.name).await.or_internal("check student")?;
        if taken.is_some_and(|other| other.id != id) {
            return Err(duplicate_name(&input.name));
        }
        if let Some(email) = input.email.as_deref().filter(|email| !email.is_empty()) {
            let taken =
                self.store.find_student_by_email(email).await.or_internal("check student")?;
            if taken.is_some_and(|other| other.id != id) {
                return Err(duplicate_email(email));
            }
        }

        let patch = StudentPatch {
            name: Some(input.name.clone()),
            email: input.email.clone().map(|email| Some(email).filter(|e| !e.is_empty())),
        };
        let updated = self
            .store
            .update_student(id, patch)
            .await
            .or_internal("update student")?
            .ok_or_else(student_not_found)?;

        if input.email.is_some() || input.password.is_some() {
            if let Err(err) = self.sync_login(&existing, &input).await {
                let restore = StudentPatch {
                    name: Some(existing.name.clone()),
                    email: Some(existing.email.clone()),
                };
                if let Err(undo) = self.store.update_student(id, restore).await {
                    tracing::error!(error = %undo, student_id = %id, "Student restore failed");
                }
                return Err(err);
            }
        }

        if let Some(assignments) = input.assignments {
            self.replace_enrollments(
                EnrollmentOwner::Student(id.to_string()),
                keys_for(id, &assignments),
            )
            .await?;
        }

        self.student_listing(updated).await
    }

    /// Moves the existing login to the new email and/or password, or creates one
    /// when the student had none and both are given.
    async fn sync_login(
        &self,
        existing: &Student,
        input: &UpdateStudentInput,
    ) -> ServiceResult<()> {
        let login = match existing.email.as_deref() {
            Some(email) => self
                .identity
                .find_user_by_email(email)
                .await
                .map_err(|err| ServiceError::internal(err, "look up login"))?,
            None => None,
        };

        let new_email = input.email.as_deref().filter(|email| !email.is_empty());
        match login {
            Some(user) => {
                let email_change =
                    new_email.filter(|email| Some(*email) != existing.email.as_deref());
                if email_change.is_none() && input.password.is_none() {
                    return Ok(());
                }
                self.identity
                    .update_user(&user.id, email_change, input.password.as_deref())
                    .await
                    .map_err(|err| {
                        ServiceError::Validation(format!(
                            "Nepodařilo se aktualizovat autentizační účet: {err}"
                        ))
                    })?;
                if let Some(email) = email_change {
                    let patch =
                        ProfilePatch { email: Some(email.to_string()), ..Default::default() };
                    self.store.update_profile(&user.id, patch).await.or_internal("update profile")?;
                }
            }
            None => {
                let (Some(email), Some(password)) = (new_email, input.password.as_deref()) else {
                    return Ok(());
                };
                let user = self
                    .identity
                    .create_user(email, password)
                    .await
                    .map_err(account_creation_failed)?;
                let profile = student_profile(user.id.clone(), email, &input.name);
                if let Err(err) = self.store.insert_profile(profile).await {
                    tracing::warn!(error = %err, user_id = %user.id, "Student profile not created");
                }
            }
        }
        Ok(())
    }

    /// Deletes the student; its login and profile are removed best-effort first.
    pub(crate) async fn delete_student(&self, id: &str) -> ServiceResult<StudentListing> {
        let student = self.find_student(id).await?;

        if let Some(email) = student.email.as_deref() {
            self.remove_login(email).await;
        }

        self.store.delete_students(&[id.to_string()]).await.or_internal("delete student")?;
        tracing::info!(student_id = %id, "Student deleted");
        Ok(StudentListing { student, subjects: Vec::new() })
    }

    pub(crate) async fn delete_students(&self, ids: &[String]) -> ServiceResult<u64> {
        self.store.delete_students(ids).await.or_internal("delete students")
    }

    /// Drops the profile and login registered under `email`. Failures are logged.
    pub(crate) async fn remove_login(&self, email: &str) {
        let user = match self.identity.find_user_by_email(email).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(error = %err, email, "Login lookup failed");
                return;
            }
        };
        if let Err(err) = self.store.delete_profile(&user.id).await {
            tracing::warn!(error = %err, user_id = %user.id, "Profile removal failed");
        }
        if let Err(err) = self.identity.delete_user(&user.id).await {
            tracing::warn!(error = %err, user_id = %user.id, "Login removal failed");
        }
    }
}
