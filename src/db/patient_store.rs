//! Patient registry — the minimal lookup the pipeline needs
//! (name and age feed the synthesis prompt).

use rusqlite::{params, Connection, OptionalExtension};

use super::sqlite::{now_utc_text, parse_datetime};
use super::DatabaseError;
use crate::models::{new_entity_id, Patient};

pub fn create(
    conn: &Connection,
    name: &str,
    age: Option<u32>,
    gender: Option<&str>,
    phone: Option<&str>,
) -> Result<Patient, DatabaseError> {
    let id = new_entity_id("PAT");
    let now = now_utc_text();

    conn.execute(
        "INSERT INTO patients (id, name, age, gender, phone, registered_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![id, name, age, gender, phone, now],
    )?;

    get(conn, &id)
}

pub fn get(conn: &Connection, patient_id: &str) -> Result<Patient, DatabaseError> {
    let row = conn
        .query_row(
            "SELECT id, name, age, gender, phone, registered_at
             FROM patients WHERE id = ?1",
            params![patient_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<u32>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            },
        )
        .optional()?
        .ok_or_else(|| DatabaseError::not_found("patient", patient_id))?;

    let (id, name, age, gender, phone, registered_at) = row;
    let registered_at = parse_datetime("patient", &id, &registered_at)?;

    Ok(Patient {
        id,
        name,
        age,
        gender,
        phone,
        registered_at,
    })
}

pub fn list(conn: &Connection) -> Result<Vec<Patient>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, age, gender, phone, registered_at
         FROM patients ORDER BY registered_at DESC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<u32>>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, String>(5)?,
        ))
    })?;

    let mut patients = Vec::new();
    for row in rows {
        let (id, name, age, gender, phone, registered_at) = row?;
        let registered_at = parse_datetime("patient", &id, &registered_at)?;
        patients.push(Patient {
            id,
            name,
            age,
            gender,
            phone,
            registered_at,
        });
    }
    Ok(patients)
}
