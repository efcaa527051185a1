//! Load data script for lexflow
//!
//! Populates the local store with a demo setup:
//! - Directory: one extra legal user and two registered clients
//! - Forms: two intake forms authored by the static `juez` account
//! - Mailbox: one submission per client, the first one answered
//! Run: cargo run --bin load_data
//! Then explore with `lexflow-cli login -u prueba -p prueba` etc.

use std::collections::HashMap;

use lexflow::auth::DocumentKind;
use lexflow::config::Config;
use lexflow::forms::{FieldDraft, FormDraft};
use lexflow::models::{FieldType, FormDefinition, Role};
use lexflow::{telemetry, LexflowError, NewUser, Registration, Workspace};
use tracing::info;

fn values(form: &FormDefinition, pairs: &[(&str, &str)]) -> HashMap<String, String> {
    form.fields
        .iter()
        .filter_map(|f| {
            pairs
                .iter()
                .find(|(label, _)| *label == f.label)
                .map(|(_, v)| (f.id.clone(), v.to_string()))
        })
        .collect()
}

fn ignore_existing<T>(outcome: Result<T, LexflowError>) -> Result<(), LexflowError> {
    match outcome {
        Ok(_) | Err(LexflowError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    let _guard = telemetry::init(&config, "info");
    let mut ws = Workspace::open(&config)?;

    ws.login("admin", "admin1")?;
    ignore_existing(ws.create_user(&NewUser {
        username: "lucia".to_string(),
        display_name: "Dra. Lucía Ramos".to_string(),
        password: "lucia123".to_string(),
        role: Role::Legal,
    }))?;
    ws.logout()?;

    // Clients self-register with a DNI and a RUC.
    let clients = [
        (DocumentKind::Dni, "45879632", "Ana Torres"),
        (DocumentKind::Ruc, "20100000009", "Comercial Andina SAC"),
    ];
    for (kind, document, name) in clients {
        ignore_existing(ws.register(&Registration {
            kind,
            document: document.to_string(),
            display_name: name.to_string(),
            password: "cliente1".to_string(),
            confirm: "cliente1".to_string(),
        }))?;
        ws.logout()?;
    }

    ws.login("juez", "juez1")?;
    let mut intake = FormDraft::new("Ficha de cliente");
    intake.add_field(&FieldDraft::new(FieldType::Text, "Nombre completo").required())?;
    intake.add_field(&FieldDraft::new(FieldType::Email, "Casilla electrónica").required())?;
    intake.add_field(&FieldDraft::new(FieldType::Phone, "Teléfono").placeholder("+51 ..."))?;
    intake.add_field(
        &FieldDraft::new(FieldType::Select, "Materia")
            .required()
            .options("Civil, Penal, Laboral, Familia"),
    )?;
    intake.add_field(&FieldDraft::new(FieldType::Checkbox, "Acepto el tratamiento de datos").required())?;
    let intake = ws.save_form(&intake)?;

    let mut hearing = FormDraft::new("Solicitud de audiencia");
    hearing.add_field(&FieldDraft::new(FieldType::Text, "Expediente").required())?;
    hearing.add_field(&FieldDraft::new(FieldType::Date, "Fecha propuesta").required())?;
    hearing.add_field(&FieldDraft::new(FieldType::Number, "Asistentes"))?;
    let hearing = ws.save_form(&hearing)?;
    ws.logout()?;

    ws.login("45879632", "cliente1")?;
    let first = ws.send_request(
        &intake.id,
        &values(
            &intake,
            &[
                ("Nombre completo", "Ana Torres"),
                ("Casilla electrónica", "ana.torres@correo.pe"),
                ("Materia", "Laboral"),
                ("Acepto el tratamiento de datos", "sí"),
            ],
        ),
    )?;
    ws.logout()?;

    ws.login("20100000009", "cliente1")?;
    ws.send_request(
        &hearing.id,
        &values(
            &hearing,
            &[
                ("Expediente", "00123-2024-0-1801-JR-CI-01"),
                ("Fecha propuesta", "2024-07-15"),
                ("Asistentes", "3"),
            ],
        ),
    )?;
    ws.logout()?;

    ws.login("juez", "juez1")?;
    ws.reply(&first.id, "Recibimos su ficha. Un abogado laboralista la contactará en 48 horas.")?;
    let pending = ws.inbox()?.len();
    ws.logout()?;

    info!(forms = 2, submissions = pending, "demo data loaded");
    println!("✅ Loaded demo users, 2 forms and {pending} submissions into {}", config.data_dir.display());
    Ok(())
}
