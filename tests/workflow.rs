use std::collections::HashMap;
use std::sync::Arc;

use lexflow::auth::CredentialSet;
use lexflow::config::MIN_BCRYPT_COST;
use lexflow::forms::{FieldDraft, FormDraft};
use lexflow::models::{FieldType, Message, PayloadValue, Role};
use lexflow::ports::{NotifyKind, Recorder, Route};
use lexflow::storage::{SledBackend, Storage};
use lexflow::{LexflowError, Registration, Workspace};

fn workspace(storage: Storage) -> (Workspace, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let ws = Workspace::new(storage, CredentialSet::demo(), MIN_BCRYPT_COST)
        .with_ports(recorder.clone(), recorder.clone());
    (ws, recorder)
}

fn register(ws: &mut Workspace, document: &str, name: &str) {
    ws.register(&Registration {
        kind: lexflow::auth::DocumentKind::Dni,
        document: document.to_string(),
        display_name: name.to_string(),
        password: "cliente1".to_string(),
        confirm: "cliente1".to_string(),
    })
    .expect("registration failed");
    ws.logout().unwrap();
}

#[test]
fn test_legal_and_client_conversation() {
    let storage = Storage::new(SledBackend::temporary().expect("Failed to open sled"));
    let (mut ws, recorder) = workspace(storage);

    register(&mut ws, "11111111", "Ana");
    register(&mut ws, "22222222", "Beto");

    // Legal authors a form.
    ws.login("juez", "juez1").unwrap();
    let mut draft = FormDraft::new("Ficha de cliente");
    draft.add_field(&FieldDraft::new(FieldType::Text, "Nombre").required()).unwrap();
    draft
        .add_field(&FieldDraft::new(FieldType::Select, "Materia").options("Civil, Penal"))
        .unwrap();
    let form = ws.save_form(&draft).unwrap();
    assert_eq!(ws.list_forms().unwrap()[0], form);

    // Ana fills it out.
    ws.login("11111111", "cliente1").unwrap();
    assert_eq!(ws.list_forms().unwrap().len(), 1);
    let values = HashMap::from([
        (form.fields[0].id.clone(), "Ana Torres".to_string()),
        (form.fields[1].id.clone(), "Penal".to_string()),
    ]);
    let submission = ws.send_request(&form.id, &values).unwrap();
    assert_eq!(submission.payload.get("Materia"), Some(&PayloadValue::Text("Penal".to_string())));
    assert_eq!(recorder.routes().last(), Some(&Route::Messages));

    // Beto cannot see it; legal can.
    ws.login("22222222", "cliente1").unwrap();
    assert!(ws.inbox().unwrap().is_empty());
    ws.login("juez", "juez1").unwrap();
    let legal_inbox = ws.inbox().unwrap();
    assert_eq!(legal_inbox.len(), 1);
    assert_eq!(legal_inbox[0].id(), submission.id);
    assert!(!ws.is_answered(&submission.id));

    let response = ws.reply(&submission.id, "Lo revisamos mañana.").unwrap();
    assert_eq!(response.to_user, "11111111");
    assert_eq!(response.form_name, "Ficha de cliente");
    assert!(ws.is_answered(&submission.id));
    // Legal inbox still lists submissions only.
    assert_eq!(ws.inbox().unwrap().len(), 1);

    // Ana sees both, newest first; Beto sees neither.
    ws.login("11111111", "cliente1").unwrap();
    let ana_inbox = ws.inbox().unwrap();
    assert_eq!(ana_inbox.len(), 2);
    assert!(matches!(&ana_inbox[0], Message::Response(r) if r.in_reply_to == submission.id));
    assert!(matches!(&ana_inbox[1], Message::Submission(s) if s.id == submission.id));
    assert!(matches!(
        ws.reply(&submission.id, "hola"),
        Err(LexflowError::Forbidden { role: Role::Client, .. })
    ));

    ws.login("22222222", "cliente1").unwrap();
    assert!(ws.inbox().unwrap().is_empty());

    let errors: Vec<_> = recorder
        .notices()
        .into_iter()
        .filter(|(kind, _)| *kind == NotifyKind::Error)
        .collect();
    assert_eq!(errors.len(), 1);
}

#[test]
fn test_session_and_data_survive_reopen() {
    let temp_dir = std::env::temp_dir().join(format!("lexflow_test_reopen_ws_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&temp_dir);

    let form_id = {
        let (mut ws, _) = workspace(Storage::open(&temp_dir).expect("Failed to open storage"));
        ws.login("juez", "juez1").unwrap();
        let mut draft = FormDraft::new("Consulta");
        draft.add_field(&FieldDraft::new(FieldType::Text, "Asunto")).unwrap();
        ws.save_form(&draft).unwrap().id
    };

    let (ws, _) = workspace(Storage::open(&temp_dir).expect("Failed to reopen storage"));
    assert_eq!(ws.session().role(), Some(Role::Legal));
    assert_eq!(ws.get_form(&form_id).unwrap().name, "Consulta");

    drop(ws);
    let _ = std::fs::remove_dir_all(temp_dir);
}

#[test]
fn test_admin_has_no_mailbox_and_no_forms() {
    let (mut ws, _) = workspace(Storage::in_memory());
    ws.login("admin", "admin1").unwrap();
    assert!(ws.inbox().unwrap().is_empty());
    assert!(ws.list_forms().is_err());
    ws.logout().unwrap();
    assert!(matches!(ws.inbox(), Err(LexflowError::NotAuthenticated { .. })));
}
