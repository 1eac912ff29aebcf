//! Subjects, teachers and students, and the enrollment rows that tie them together.
//!
//! Name filters on related entities (a teacher's subject, a student's teacher)
//! are resolved to id sets first and then applied to the active enrollments.

mod students;
mod subjects;
mod teachers;

use std::collections::{HashMap, HashSet};

use crate::db::models::{Enrollment, Student, Subject, Teacher};
use crate::repositories::store::{
    EnrollmentFilter, EnrollmentOwner, EntityFilter, SurveyStore, TripleKey,
};
use crate::services::assignments::AssignmentResolver;
use crate::services::error::{OrInternal, ServiceResult};
use crate::services::identity::IdentityProvider;

pub(crate) use students::{
    split_name, CreateStudentInput, StudentAssignmentInput, UpdateStudentInput,
};
pub(crate) use teachers::TeacherAssignmentInput;

pub(crate) const SUBJECT_NOT_FOUND: &str = "Předmět nenalezen";
pub(crate) const TEACHER_NOT_FOUND: &str = "Učitel nenalezen";
pub(crate) const STUDENT_NOT_FOUND: &str = "Student nenalezen";

#[derive(Debug, Clone)]
pub(crate) struct TeacherSubject {
    pub(crate) subject: Subject,
    pub(crate) student_count: i64,
}

#[derive(Debug, Clone)]
pub(crate) struct TeacherListing {
    pub(crate) teacher: Teacher,
    pub(crate) subjects: Vec<TeacherSubject>,
}

#[derive(Debug, Clone)]
pub(crate) struct StudentSubject {
    pub(crate) subject: Subject,
    pub(crate) teacher: Option<Teacher>,
}

#[derive(Debug, Clone)]
pub(crate) struct StudentListing {
    pub(crate) student: Student,
    pub(crate) subjects: Vec<StudentSubject>,
}

#[derive(Debug, Clone)]
pub(crate) struct StudentWithSubjects {
    pub(crate) student: Student,
    pub(crate) subjects: Vec<Subject>,
}

/// Teacher picker data: every subject plus the students enrolled in each.
#[derive(Debug, Clone)]
pub(crate) struct TeacherFormData {
    pub(crate) subjects: Vec<Subject>,
    pub(crate) students: Vec<StudentWithSubjects>,
}

#[derive(Debug, Clone)]
pub(crate) struct SubjectWithTeachers {
    pub(crate) subject: Subject,
    pub(crate) teachers: Vec<Teacher>,
}

pub(crate) struct DirectoryService<'a> {
    store: &'a dyn SurveyStore,
    identity: &'a dyn IdentityProvider,
}

impl<'a> DirectoryService<'a> {
    pub(crate) fn new(store: &'a dyn SurveyStore, identity: &'a dyn IdentityProvider) -> Self {
        Self { store, identity }
    }

    fn resolver(&self) -> AssignmentResolver<'a> {
        AssignmentResolver::new(self.store)
    }

    /// Deactivates every active row of `owner`, then reactivates or inserts one
    /// row per distinct key.
    async fn replace_enrollments(
        &self,
        owner: EnrollmentOwner,
        keys: Vec<TripleKey>,
    ) -> ServiceResult<()> {
        self.store.deactivate_enrollments(&owner).await.or_internal("deactivate assignments")?;

        let mut seen = HashSet::new();
        for key in keys {
            if !seen.insert(key.clone()) {
                continue;
            }
            match self.store.find_enrollment(&key).await.or_internal("load assignment")? {
                Some(existing) => self
                    .store
                    .set_enrollment_active(&existing.id, true)
                    .await
                    .or_internal("reactivate assignment")?,
                None => {
                    self.store
                        .insert_enrollments(std::slice::from_ref(&key))
                        .await
                        .or_internal("create assignment")?;
                }
            }
        }
        Ok(())
    }

    /// Ids of subjects whose name contains `needle`.
    async fn subject_ids_named(&self, needle: &str) -> ServiceResult<Vec<String>> {
        let filter = EntityFilter { name: Some(needle.to_string()), ids: None };
        let (subjects, _) =
            self.store.list_subjects(&filter, None).await.or_internal("fetch subjects")?;
        Ok(subjects.into_iter().map(|subject| subject.id).collect())
    }

    async fn teacher_ids_named(&self, needle: &str) -> ServiceResult<Vec<String>> {
        let filter = EntityFilter { name: Some(needle.to_string()), ids: None };
        let (teachers, _) =
            self.store.list_teachers(&filter, None).await.or_internal("fetch teachers")?;
        Ok(teachers.into_iter().map(|teacher| teacher.id).collect())
    }

    /// Active rows touching any of `subject_ids`.
    async fn active_rows_for_subjects(
        &self,
        subject_ids: &[String],
        require_student: bool,
    ) -> ServiceResult<Vec<Enrollment>> {
        let mut rows = Vec::new();
        for subject_id in subject_ids {
            let filter = EnrollmentFilter {
                subject_id: Some(subject_id.clone()),
                require_student,
                ..EnrollmentFilter::default()
            };
            rows.extend(self.resolver().active_enrollments(&filter).await?);
        }
        Ok(rows)
    }

    /// Subject and teacher records referenced by `rows`, keyed by id.
    async fn parties(
        &self,
        rows: &[Enrollment],
    ) -> ServiceResult<(HashMap<String, Subject>, HashMap<String, Teacher>)> {
        let subject_ids = distinct(rows.iter().map(|row| row.subject_id.clone()));
        let teacher_ids = distinct(rows.iter().filter_map(|row| row.teacher_id.clone()));
        let (subjects, teachers) = tokio::try_join!(
            self.store.find_subjects_by_ids(&subject_ids),
            self.store.find_teachers_by_ids(&teacher_ids),
        )
        .or_internal("load subjects and teachers")?;
        Ok((
            subjects.into_iter().map(|s| (s.id.clone(), s)).collect(),
            teachers.into_iter().map(|t| (t.id.clone(), t)).collect(),
        ))
    }

    /// Every subject with its students; feeds the teacher editing form.
    pub(crate) async fn teacher_form_data(&self) -> ServiceResult<TeacherFormData> {
        let everything = EntityFilter::default();
        let ((subjects, _), (students, _)) = tokio::try_join!(
            self.store.list_subjects(&everything, None),
            self.store.list_students(&everything, None),
        )
        .or_internal("fetch assignment data")?;

        let rows = self.resolver().active_enrollments(&EnrollmentFilter::students_only()).await?;
        let mut by_student: HashMap<&str, HashSet<&str>> = HashMap::new();
        for row in &rows {
            if let Some(student_id) = row.student_id.as_deref() {
                by_student.entry(student_id).or_default().insert(row.subject_id.as_str());
            }
        }

        let students = students
            .iter()
            .map(|student| StudentWithSubjects {
                student: student.clone(),
                subjects: subjects
                    .iter()
                    .filter(|subject| {
                        by_student
                            .get(student.id.as_str())
                            .is_some_and(|ids| ids.contains(subject.id.as_str()))
                    })
                    .cloned()
                    .collect(),
            })
            .collect();
        Ok(TeacherFormData { subjects, students })
    }

    /// Every subject with the distinct teachers that teach it; feeds the student
    /// editing form.
    pub(crate) async fn student_form_data(&self) -> ServiceResult<Vec<SubjectWithTeachers>> {
        let (subjects, _) = self
            .store
            .list_subjects(&EntityFilter::default(), None)
            .await
            .or_internal("fetch subjects")?;
        let rows = self.resolver().active_enrollments(&EnrollmentFilter::default()).await?;
        let (_, teachers) = self.parties(&rows).await?;

        let mut by_subject: HashMap<&str, Vec<Teacher>> = HashMap::new();
        for row in &rows {
            let Some(teacher) = row.teacher_id.as_ref().and_then(|id| teachers.get(id)) else {
                continue;
            };
            let entry = by_subject.entry(row.subject_id.as_str()).or_default();
            if !entry.iter().any(|known| known.id == teacher.id) {
                entry.push(teacher.clone());
            }
        }

        Ok(subjects
            .iter()
            .map(|subject| SubjectWithTeachers {
                teachers: by_subject.remove(subject.id.as_str()).unwrap_or_default(),
                subject: subject.clone(),
            })
            .collect())
    }
}

fn distinct(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut ids: Vec<String> = ids.collect();
    ids.sort();
    ids.dedup();
    ids
}
