use async_graphql::{InputObject, SimpleObject};

use crate::core::time::format_primitive;
use crate::db::models::{Student, Subject, Teacher};
use crate::services::directory::{
    StudentAssignmentInput, StudentListing, StudentSubject, StudentWithSubjects,
    SubjectWithTeachers, TeacherAssignmentInput, TeacherFormData, TeacherListing, TeacherSubject,
};

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Subject")]
pub(crate) struct SubjectView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Subject> for SubjectView {
    fn from(subject: Subject) -> Self {
        Self {
            id: subject.id,
            name: subject.name,
            created_at: format_primitive(subject.created_at),
            updated_at: format_primitive(subject.updated_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Teacher")]
pub(crate) struct TeacherView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Teacher> for TeacherView {
    fn from(teacher: Teacher) -> Self {
        Self {
            id: teacher.id,
            name: teacher.name,
            created_at: format_primitive(teacher.created_at),
            updated_at: format_primitive(teacher.updated_at),
        }
    }
}

#[derive(Debug, Clone, SimpleObject)]
#[graphql(name = "Student")]
pub(crate) struct StudentView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<Student> for StudentView {
    fn from(student: Student) -> Self {
        Self {
            id: student.id,
            name: student.name,
            email: student.email,
            created_at: format_primitive(student.created_at),
            updated_at: format_primitive(student.updated_at),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "TeacherSubject")]
pub(crate) struct TeacherSubjectView {
    pub(crate) subject: SubjectView,
    /// Distinct students with an active row for this subject and teacher.
    pub(crate) student_count: i64,
}

impl From<TeacherSubject> for TeacherSubjectView {
    fn from(entry: TeacherSubject) -> Self {
        Self { subject: entry.subject.into(), student_count: entry.student_count }
    }
}

/// A teacher with the subjects they currently teach.
#[derive(Debug, SimpleObject)]
pub(crate) struct TeacherDetail {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) subjects: Vec<TeacherSubjectView>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<TeacherListing> for TeacherDetail {
    fn from(listing: TeacherListing) -> Self {
        let teacher = TeacherView::from(listing.teacher);
        Self {
            id: teacher.id,
            name: teacher.name,
            subjects: listing.subjects.into_iter().map(Into::into).collect(),
            created_at: teacher.created_at,
            updated_at: teacher.updated_at,
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "StudentSubject")]
pub(crate) struct StudentSubjectView {
    pub(crate) subject: SubjectView,
    pub(crate) teacher: Option<TeacherView>,
}

impl From<StudentSubject> for StudentSubjectView {
    fn from(entry: StudentSubject) -> Self {
        Self { subject: entry.subject.into(), teacher: entry.teacher.map(Into::into) }
    }
}

/// A student with their active (subject, teacher) assignments.
#[derive(Debug, SimpleObject)]
pub(crate) struct StudentDetail {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) subjects: Vec<StudentSubjectView>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl From<StudentListing> for StudentDetail {
    fn from(listing: StudentListing) -> Self {
        let student = StudentView::from(listing.student);
        Self {
            id: student.id,
            name: student.name,
            email: student.email,
            subjects: listing.subjects.into_iter().map(Into::into).collect(),
            created_at: student.created_at,
            updated_at: student.updated_at,
        }
    }
}

#[derive(Debug, SimpleObject)]
pub(crate) struct SubjectPayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) subject: Option<SubjectView>,
}

#[derive(Debug, SimpleObject)]
pub(crate) struct TeacherPayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) teacher: Option<TeacherDetail>,
}

#[derive(Debug, SimpleObject)]
pub(crate) struct StudentPayload {
    pub(crate) success: bool,
    pub(crate) message: String,
    pub(crate) student: Option<StudentDetail>,
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "StudentWithSubjects")]
pub(crate) struct StudentWithSubjectsView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) email: Option<String>,
    pub(crate) subjects: Vec<SubjectView>,
}

impl From<StudentWithSubjects> for StudentWithSubjectsView {
    fn from(entry: StudentWithSubjects) -> Self {
        Self {
            id: entry.student.id,
            name: entry.student.name,
            email: entry.student.email,
            subjects: entry.subjects.into_iter().map(Into::into).collect(),
        }
    }
}

/// Form data for editing teachers: every subject and every student with the
/// subjects they are enrolled in.
#[derive(Debug, SimpleObject)]
#[graphql(name = "AssignmentData")]
pub(crate) struct AssignmentDataView {
    pub(crate) subjects: Vec<SubjectView>,
    pub(crate) students: Vec<StudentWithSubjectsView>,
}

impl From<TeacherFormData> for AssignmentDataView {
    fn from(data: TeacherFormData) -> Self {
        Self {
            subjects: data.subjects.into_iter().map(Into::into).collect(),
            students: data.students.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, SimpleObject)]
#[graphql(name = "SubjectWithTeachers")]
pub(crate) struct SubjectWithTeachersView {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) teachers: Vec<TeacherView>,
}

impl From<SubjectWithTeachers> for SubjectWithTeachersView {
    fn from(entry: SubjectWithTeachers) -> Self {
        Self {
            id: entry.subject.id,
            name: entry.subject.name,
            teachers: entry.teachers.into_iter().map(Into::into).collect(),
        }
    }
}

/// A subject the teacher teaches; an empty `student_ids` records the subject alone.
#[derive(Debug, InputObject)]
#[graphql(name = "TeacherAssignmentInput")]
pub(crate) struct TeacherAssignmentArg {
    pub(crate) subject_id: String,
    #[graphql(default)]
    pub(crate) student_ids: Vec<String>,
}

impl From<TeacherAssignmentArg> for TeacherAssignmentInput {
    fn from(arg: TeacherAssignmentArg) -> Self {
        Self { subject_id: arg.subject_id, student_ids: arg.student_ids }
    }
}

#[derive(Debug, InputObject)]
#[graphql(name = "StudentAssignmentInput")]
pub(crate) struct StudentAssignmentArg {
    pub(crate) subject_id: String,
    pub(crate) teacher_id: Option<String>,
}

impl From<StudentAssignmentArg> for StudentAssignmentInput {
    fn from(arg: StudentAssignmentArg) -> Self {
        Self { subject_id: arg.subject_id, teacher_id: arg.teacher_id }
    }
}
