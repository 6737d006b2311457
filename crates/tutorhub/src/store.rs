//! In-memory storage backing every workflow repository.
//!
//! One mutex guards all tables, so each uniqueness check and compare-and-set
//! runs atomically with its write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::workflows::courses::{
    Article, ArticleId, CompletenessChecker, Course, CourseId, CourseRepository, CourseStatus,
    CourseTree, GuardedWrite, Section, SectionId, SectionTree,
};
use crate::workflows::enrollment::{
    Enrollment, EnrollmentId, EnrollmentRepository, EnrollmentStatus,
};
use crate::workflows::tutors::{
    TutorApplication, TutorApplicationId, TutorApplicationRepository, TutorApplicationStatus,
};
use crate::workflows::{RepositoryError, UserId};

#[derive(Default)]
struct Tables {
    applications: HashMap<TutorApplicationId, TutorApplication>,
    courses: HashMap<CourseId, Course>,
    sections: HashMap<SectionId, Section>,
    articles: HashMap<ArticleId, Article>,
    enrollments: HashMap<EnrollmentId, Enrollment>,
}

impl Tables {
    fn drop_articles_of(&mut self, section: &SectionId) {
        self.articles
            .retain(|_, article| &article.section_id != section);
    }
}

#[derive(Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl TutorApplicationRepository for MemoryStore {
    fn insert(
        &self,
        application: TutorApplication,
    ) -> Result<TutorApplication, RepositoryError> {
        let mut tables = self.lock()?;
        let duplicate = tables.applications.contains_key(&application.id)
            || tables.applications.values().any(|existing| {
                existing.applicant == application.applicant && existing.status.is_active()
            });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        tables
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch(
        &self,
        id: &TutorApplicationId,
    ) -> Result<Option<TutorApplication>, RepositoryError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn find_by_applicant(
        &self,
        applicant: &UserId,
    ) -> Result<Option<TutorApplication>, RepositoryError> {
        let tables = self.lock()?;
        let mut owned: Vec<&TutorApplication> = tables
            .applications
            .values()
            .filter(|application| &application.applicant == applicant)
            .collect();
        owned.sort_by(|a, b| (a.submitted_at, &a.id).cmp(&(b.submitted_at, &b.id)));

        let active = owned
            .iter()
            .rev()
            .find(|application| application.status.is_active());
        Ok(active.or(owned.last()).map(|application| (*application).clone()))
    }

    fn replace_if(
        &self,
        application: TutorApplication,
        expected: TutorApplicationStatus,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        match tables.applications.get_mut(&application.id) {
            Some(stored) if stored.status == expected => {
                *stored = application;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_if(
        &self,
        id: &TutorApplicationId,
        expected: TutorApplicationStatus,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        let matches = tables
            .applications
            .get(id)
            .is_some_and(|stored| stored.status == expected);
        if matches {
            tables.applications.remove(id);
        }
        Ok(matches)
    }

    fn pending(&self) -> Result<Vec<TutorApplication>, RepositoryError> {
        let tables = self.lock()?;
        let mut pending: Vec<TutorApplication> = tables
            .applications
            .values()
            .filter(|application| application.status == TutorApplicationStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by(|a, b| (a.submitted_at, &a.id).cmp(&(b.submitted_at, &b.id)));
        Ok(pending)
    }
}

fn sorted_courses<'a>(courses: impl Iterator<Item = &'a Course>) -> Vec<Course> {
    let mut listed: Vec<Course> = courses.cloned().collect();
    listed.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    listed
}

impl Tables {
    fn sections_of(&self, course: &CourseId) -> Vec<Section> {
        let mut sections: Vec<Section> = self
            .sections
            .values()
            .filter(|section| &section.course_id == course)
            .cloned()
            .collect();
        sections.sort_by_key(|section| section.position);
        sections
    }

    fn articles_of(&self, section: &SectionId) -> Vec<Article> {
        let mut articles: Vec<Article> = self
            .articles
            .values()
            .filter(|article| &article.section_id == section)
            .cloned()
            .collect();
        articles.sort_by_key(|article| article.position);
        articles
    }

    fn tree_of(&self, course: Course) -> CourseTree {
        let sections = self
            .sections_of(&course.id)
            .into_iter()
            .map(|section| {
                let articles = self.articles_of(&section.id);
                SectionTree { section, articles }
            })
            .collect();
        CourseTree { course, sections }
    }

    fn ensure_course_unlocked(&self, course: &CourseId) -> Result<(), RepositoryError> {
        match self.courses.get(course) {
            Some(stored) if stored.status.is_locked() => Err(RepositoryError::Locked),
            Some(_) => Ok(()),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn ensure_section_unlocked(&self, section: &SectionId) -> Result<(), RepositoryError> {
        let stored = self.sections.get(section).ok_or(RepositoryError::NotFound)?;
        self.ensure_course_unlocked(&stored.course_id)
    }

    fn ensure_article_unlocked(&self, article: &ArticleId) -> Result<(), RepositoryError> {
        let stored = self.articles.get(article).ok_or(RepositoryError::NotFound)?;
        self.ensure_section_unlocked(&stored.section_id)
    }
}

impl CourseRepository for MemoryStore {
    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.courses.contains_key(&course.id) {
            return Err(RepositoryError::Conflict);
        }
        tables.courses.insert(course.id.clone(), course.clone());
        Ok(course)
    }

    fn replace_course_if(
        &self,
        course: Course,
        expected: CourseStatus,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        match tables.courses.get_mut(&course.id) {
            Some(stored) if stored.status == expected => {
                *stored = course;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn replace_course_if_complete(
        &self,
        course: Course,
        expected: CourseStatus,
        checker: &CompletenessChecker,
    ) -> Result<GuardedWrite, RepositoryError> {
        let mut tables = self.lock()?;
        let stored = tables
            .courses
            .get(&course.id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        if stored.status != expected {
            return Ok(GuardedWrite::StatusChanged);
        }

        let verdict = checker.assess(&tables.tree_of(stored));
        if !verdict.is_complete() {
            return Ok(GuardedWrite::Incomplete(verdict));
        }

        tables.courses.insert(course.id.clone(), course);
        Ok(GuardedWrite::Written)
    }

    fn fetch_course(&self, id: &CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.lock()?.courses.get(id).cloned())
    }

    fn delete_course(&self, id: &CourseId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.courses.remove(id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        let orphaned: Vec<SectionId> = tables
            .sections
            .values()
            .filter(|section| &section.course_id == id)
            .map(|section| section.id.clone())
            .collect();
        for section in &orphaned {
            tables.sections.remove(section);
            tables.drop_articles_of(section);
        }
        Ok(())
    }

    fn courses_with_status(&self, status: CourseStatus) -> Result<Vec<Course>, RepositoryError> {
        let tables = self.lock()?;
        Ok(sorted_courses(
            tables.courses.values().filter(|course| course.status == status),
        ))
    }

    fn courses_by_tutor(&self, tutor: &UserId) -> Result<Vec<Course>, RepositoryError> {
        let tables = self.lock()?;
        Ok(sorted_courses(
            tables.courses.values().filter(|course| &course.tutor_id == tutor),
        ))
    }

    fn insert_section(&self, mut section: Section) -> Result<Section, RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_course_unlocked(&section.course_id)?;
        if tables.sections.contains_key(&section.id) {
            return Err(RepositoryError::Conflict);
        }
        let last = tables
            .sections
            .values()
            .filter(|existing| existing.course_id == section.course_id)
            .map(|existing| existing.position)
            .max()
            .unwrap_or(0);
        section.position = last + 1;
        tables.sections.insert(section.id.clone(), section.clone());
        Ok(section)
    }

    fn update_section(&self, section: Section) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_section_unlocked(&section.id)?;
        tables.sections.insert(section.id.clone(), section);
        Ok(())
    }

    fn fetch_section(&self, id: &SectionId) -> Result<Option<Section>, RepositoryError> {
        Ok(self.lock()?.sections.get(id).cloned())
    }

    fn delete_section(&self, id: &SectionId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_section_unlocked(id)?;
        tables.sections.remove(id);
        tables.drop_articles_of(id);
        Ok(())
    }

    fn sections_for(&self, course: &CourseId) -> Result<Vec<Section>, RepositoryError> {
        Ok(self.lock()?.sections_of(course))
    }

    fn insert_article(&self, mut article: Article) -> Result<Article, RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_section_unlocked(&article.section_id)?;
        if tables.articles.contains_key(&article.id) {
            return Err(RepositoryError::Conflict);
        }
        let last = tables
            .articles
            .values()
            .filter(|existing| existing.section_id == article.section_id)
            .map(|existing| existing.position)
            .max()
            .unwrap_or(0);
        article.position = last + 1;
        tables.articles.insert(article.id.clone(), article.clone());
        Ok(article)
    }

    fn update_article(&self, article: Article) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_article_unlocked(&article.id)?;
        tables.articles.insert(article.id.clone(), article);
        Ok(())
    }

    fn fetch_article(&self, id: &ArticleId) -> Result<Option<Article>, RepositoryError> {
        Ok(self.lock()?.articles.get(id).cloned())
    }

    fn delete_article(&self, id: &ArticleId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables.ensure_article_unlocked(id)?;
        tables.articles.remove(id);
        Ok(())
    }

    fn articles_for(&self, section: &SectionId) -> Result<Vec<Article>, RepositoryError> {
        Ok(self.lock()?.articles_of(section))
    }

    /// Snapshot of the whole tree under one lock.
    fn load_tree(&self, id: &CourseId) -> Result<Option<CourseTree>, RepositoryError> {
        let tables = self.lock()?;
        Ok(tables
            .courses
            .get(id)
            .cloned()
            .map(|course| tables.tree_of(course)))
    }
}

impl EnrollmentRepository for MemoryStore {
    fn insert(&self, enrollment: Enrollment) -> Result<Enrollment, RepositoryError> {
        let mut tables = self.lock()?;
        let duplicate = tables.enrollments.contains_key(&enrollment.id)
            || tables.enrollments.values().any(|existing| {
                existing.student_id == enrollment.student_id
                    && existing.course_id == enrollment.course_id
                    && existing.status.is_active()
            });
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        tables
            .enrollments
            .insert(enrollment.id.clone(), enrollment.clone());
        Ok(enrollment)
    }

    fn fetch(&self, id: &EnrollmentId) -> Result<Option<Enrollment>, RepositoryError> {
        Ok(self.lock()?.enrollments.get(id).cloned())
    }

    fn replace_if(
        &self,
        enrollment: Enrollment,
        expected: EnrollmentStatus,
    ) -> Result<bool, RepositoryError> {
        let mut tables = self.lock()?;
        match tables.enrollments.get_mut(&enrollment.id) {
            Some(stored) if stored.status == expected => {
                *stored = enrollment;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(RepositoryError::NotFound),
        }
    }

    fn for_student(&self, student: &UserId) -> Result<Vec<Enrollment>, RepositoryError> {
        let tables = self.lock()?;
        let mut owned: Vec<Enrollment> = tables
            .enrollments
            .values()
            .filter(|enrollment| &enrollment.student_id == student)
            .cloned()
            .collect();
        owned.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(owned)
    }
}
