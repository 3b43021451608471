//! Demo catalog used when `SEED_DEMO_DATA` is set.
//!
//! Goes through the managers like any other caller, so rows that already
//! exist are skipped rather than overwritten.

use chrono::{NaiveTime, Weekday};
use tracing::{debug, info};

use crate::database::{
    Building, Course, Degree, Department, Major, Meeting, Role, School, Section, User,
};
use crate::error::{RegistrarError, Result};
use crate::registrar::Registrar;

/// Seed the demo catalog. Returns the number of entities created.
pub fn seed_demo_data(registrar: &Registrar) -> Result<usize> {
    let university = &registrar.university;
    let mut created = 0;

    created += skip_duplicate(university.add_school(&School::new(1, "School of Engineering")))?;
    created += skip_duplicate(university.add_school(&School::new(2, "School of Arts and Sciences")))?;
    created += skip_duplicate(university.add_department(&Department::new(10, 1, "CS", "Computer Science")))?;
    created += skip_duplicate(university.add_department(&Department::new(11, 1, "EE", "Electrical Engineering")))?;
    created += skip_duplicate(university.add_department(&Department::new(20, 2, "MATH", "Mathematics")))?;
    created += skip_duplicate(university.add_major(&Major::new(100, 10, "Computer Science", Degree::Bachelor)))?;
    created += skip_duplicate(university.add_major(&Major::new(101, 20, "Applied Mathematics", Degree::Bachelor)))?;
    created += skip_duplicate(university.add_building(&Building::new(1, "ENG", "Engineering Hall")))?;
    created += skip_duplicate(university.add_building(&Building::new(2, "SCI", "Science Center")))?;

    let users = &registrar.users;
    created += skip_duplicate(users.add_user(&User::new("F0001", "Grace", "Hopper", "ghopper@example.edu", Role::Faculty)))?;
    created += skip_duplicate(users.add_user(&User::new("F0002", "Emmy", "Noether", "enoether@example.edu", Role::Faculty)))?;
    created += skip_duplicate(users.add_user(
        &User::new("S0001", "Ada", "Lovelace", "alovelace@example.edu", Role::Student).with_major(100),
    ))?;

    let courses = &registrar.courses;
    created += skip_duplicate(courses.add_course(&Course::new(1000, 10, 101, "Introduction to Programming", 4)))?;
    created += skip_duplicate(courses.add_course(&Course::new(1001, 10, 310, "Compilers", 4)))?;
    created += skip_duplicate(courses.add_course(&Course::new(2000, 20, 221, "Linear Algebra", 3)))?;

    let mwf = |hour: u32| -> Vec<Meeting> {
        [Weekday::Mon, Weekday::Wed, Weekday::Fri]
            .into_iter()
            .filter_map(|day| {
                let start = NaiveTime::from_hms_opt(hour, 0, 0)?;
                let end = NaiveTime::from_hms_opt(hour, 50, 0)?;
                Some(Meeting::new(day, start, end))
            })
            .collect()
    };

    created += skip_duplicate(courses.add_section(
        &Section::new(5000, 1000, "001", "2026FA", 1, "101", 120)
            .with_instructor("F0001")
            .with_meetings(mwf(9)),
    ))?;
    created += skip_duplicate(courses.add_section(
        &Section::new(5001, 1001, "001", "2026FA", 1, "204", 40)
            .with_instructor("F0001")
            .with_meetings(mwf(11)),
    ))?;
    created += skip_duplicate(courses.add_section(
        &Section::new(5002, 2000, "001", "2026FA", 2, "310", 60)
            .with_instructor("F0002")
            .with_meetings(mwf(10)),
    ))?;

    info!("Seeded {} demo entities", created);
    Ok(created)
}

fn skip_duplicate(result: Result<()>) -> Result<usize> {
    match result {
        Ok(()) => Ok(1),
        Err(RegistrarError::DuplicateEntity { kind, key }) => {
            debug!("Seed: {} {} already exists", kind, key);
            Ok(0)
        }
        Err(e) => Err(e),
    }
}
