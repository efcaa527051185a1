use clap::{Parser, Subcommand, ValueEnum};
use std::collections::HashMap;

use lexflow::auth::DocumentKind;
use lexflow::config::Config;
use lexflow::forms::{FieldDraft, FormDraft};
use lexflow::models::{FieldType, FormDefinition, Message, Role};
use lexflow::ports::{Navigator, NotifyKind, Notifier, Route};
use lexflow::{telemetry, NewUser, Registration, Workspace};

#[derive(Parser)]
#[command(name = "lexflow-cli")]
#[command(about = "CLI for the lexflow case-intake store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum DocKind {
    Dni,
    Ruc,
}

impl From<DocKind> for DocumentKind {
    fn from(kind: DocKind) -> Self {
        match kind {
            DocKind::Dni => DocumentKind::Dni,
            DocKind::Ruc => DocumentKind::Ruc,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    Logout,
    Whoami,
    /// Register as a client using a DNI or RUC as username
    Register {
        #[arg(short, long, value_enum, default_value = "dni")]
        kind: DocKind,
        #[arg(short, long)]
        document: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long)]
        confirm: String,
    },
    /// Admin only
    CreateUser {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        password: String,
        #[arg(short, long, default_value = "client")]
        role: Role,
    },
    Users,
    Forms,
    ShowForm {
        #[arg(short, long)]
        id: String,
    },
    /// Legal only. Fields as `type:label[:required][:opt1,opt2]`
    CreateForm {
        #[arg(short, long)]
        name: String,
        #[arg(short, long = "field", required = true)]
        fields: Vec<String>,
    },
    /// Client only. Values as `field=value`, field given by id or label
    Send {
        #[arg(short, long)]
        form: String,
        #[arg(short, long = "value")]
        values: Vec<String>,
    },
    Inbox,
    /// Legal only
    Reply {
        #[arg(short, long)]
        submission: String,
        #[arg(short, long)]
        body: String,
    },
}

/// Success notices on stdout, errors on stderr.
struct Console;

impl Notifier for Console {
    fn notify(&self, kind: NotifyKind, message: &str) {
        match kind {
            NotifyKind::Success => println!("✅ {message}"),
            NotifyKind::Error => eprintln!("❌ {message}"),
        }
    }
}

impl Navigator for Console {
    fn navigate_to(&self, route: Route) {
        tracing::debug!(route = route.path(), "navigate");
    }
}

fn parse_field_spec(spec: &str) -> Result<FieldDraft, String> {
    let mut parts = spec.split(':');
    let field_type: FieldType = parts
        .next()
        .unwrap_or_default()
        .parse()
        .map_err(|e| format!("{spec}: {e}"))?;
    let label = parts.next().ok_or_else(|| format!("{spec}: missing label"))?;
    let mut draft = FieldDraft::new(field_type, label);
    for extra in parts {
        if extra.eq_ignore_ascii_case("required") {
            draft = draft.required();
        } else {
            draft = draft.options(extra);
        }
    }
    Ok(draft)
}

fn resolve_values(form: &FormDefinition, pairs: &[String]) -> Result<HashMap<String, String>, String> {
    let mut values = HashMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("`{pair}` is not field=value"))?;
        let field = form
            .fields
            .iter()
            .find(|f| f.id == key || f.label == key)
            .ok_or_else(|| format!("form \"{}\" has no field `{key}`", form.name))?;
        values.insert(field.id.clone(), value.to_string());
    }
    Ok(values)
}

fn print_form(form: &FormDefinition) {
    println!("{}  {}", form.id, form.name);
    for field in &form.fields {
        let required = if field.required { " *" } else { "" };
        print!("    {:<10} {}{}", field.field_type.as_str(), field.label, required);
        if let Some(options) = &field.options {
            print!("  [{}]", options.join(", "));
        }
        println!();
    }
}

fn print_message(ws: &Workspace, message: &Message) {
    let when = message.created_at().format("%Y-%m-%d %H:%M");
    match message {
        Message::Submission(s) => {
            let status = if ws.is_answered(&s.id) { "answered" } else { "pending" };
            println!(
                "{}  {}  submission from {} ({})  form \"{}\"  [{}]",
                s.id, when, s.from_display, s.from, s.form_name, status
            );
            for entry in s.payload.iter() {
                println!("    {}: {}", entry.label, entry.value);
            }
        }
        Message::Response(r) => {
            println!("{}  {}  response on \"{}\"", r.id, when, r.form_name);
            println!("    {}", r.body);
        }
    }
}

fn run(ws: &mut Workspace, command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Login { username, password } => {
            ws.login(&username, &password)?;
        }
        Commands::Logout => ws.logout()?,
        Commands::Whoami => match ws.session().identity() {
            Some(me) => {
                println!("{} ({}) role={}", me.display_name, me.username, me.role);
                let sections: Vec<_> = me.role.home_sections().iter().map(Route::path).collect();
                println!("sections: {}", sections.join(" "));
            }
            None => println!("Not signed in"),
        },
        Commands::Register { kind, document, name, password, confirm } => {
            ws.register(&Registration {
                kind: kind.into(),
                document,
                display_name: name,
                password,
                confirm,
            })?;
        }
        Commands::CreateUser { username, name, password, role } => {
            ws.create_user(&NewUser {
                username,
                display_name: name,
                password,
                role,
            })?;
        }
        Commands::Users => {
            for u in ws.list_users()? {
                println!("{:<16} {:<8} {}", u.username, u.role.as_str(), u.display_name);
            }
        }
        Commands::Forms => {
            let forms = ws.list_forms()?;
            if forms.is_empty() {
                println!("No saved forms");
            }
            for f in forms {
                println!("{}  {}  ({} fields)", f.id, f.name, f.fields.len());
            }
        }
        Commands::ShowForm { id } => print_form(&ws.get_form(&id)?),
        Commands::CreateForm { name, fields } => {
            let mut draft = FormDraft::new(name);
            for spec in &fields {
                let field = parse_field_spec(spec).inspect_err(|e| eprintln!("❌ {e}"))?;
                draft.add_field(&field).inspect_err(|e| eprintln!("❌ {spec}: {e}"))?;
            }
            print_form(&ws.save_form(&draft)?);
        }
        Commands::Send { form, values } => {
            let form = ws.get_form(&form)?;
            let values = resolve_values(&form, &values).inspect_err(|e| eprintln!("❌ {e}"))?;
            let sent = ws.send_request(&form.id, &values)?;
            println!("submission id: {}", sent.id);
        }
        Commands::Inbox => {
            let messages = ws.inbox()?;
            if messages.is_empty() {
                println!("Mailbox empty");
            }
            for m in &messages {
                print_message(ws, m);
            }
        }
        Commands::Reply { submission, body } => {
            ws.reply(&submission, &body)?;
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    let _guard = telemetry::init(&config, "warn");

    let mut ws = Workspace::open(&config)?.with_ports(Console, Console);

    // The Console notifier has already printed the reason.
    if run(&mut ws, cli.command).is_err() {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lexflow::models::Field;

    #[test]
    fn test_field_syntax() {
        let field = parse_field_spec("select:Materia:required:Civil, Penal").unwrap();
        assert_eq!(field.field_type, FieldType::Select);
        assert_eq!(field.label, "Materia");
        assert!(field.required);
        let built = field.build().unwrap();
        assert_eq!(built.options, Some(vec!["Civil".to_string(), "Penal".to_string()]));

        let field = parse_field_spec("tel:Teléfono").unwrap();
        assert_eq!(field.field_type, FieldType::Phone);
        assert!(!field.required);

        assert!(parse_field_spec("text").unwrap_err().contains("missing label"));
        assert!(parse_field_spec("color:Tono").unwrap_err().starts_with("color:Tono"));
    }

    #[test]
    fn test_values_resolve_by_id_or_label() {
        let form = FormDefinition {
            id: "f1".to_string(),
            name: "Ficha".to_string(),
            fields: vec![
                Field {
                    id: "a1".to_string(),
                    field_type: FieldType::Text,
                    label: "Nombre".to_string(),
                    required: true,
                    placeholder: None,
                    options: None,
                },
                Field {
                    id: "b2".to_string(),
                    field_type: FieldType::Email,
                    label: "Correo".to_string(),
                    required: false,
                    placeholder: None,
                    options: None,
                },
            ],
        };

        let values = resolve_values(
            &form,
            &["Nombre=Ana=Torres".to_string(), "b2=ana@correo.pe".to_string()],
        )
        .unwrap();
        assert_eq!(values.get("a1").map(String::as_str), Some("Ana=Torres"));
        assert_eq!(values.get("b2").map(String::as_str), Some("ana@correo.pe"));

        assert!(resolve_values(&form, &["Nombre".to_string()]).unwrap_err().contains("field=value"));
        assert!(resolve_values(&form, &["Edad=3".to_string()]).unwrap_err().contains("no field `Edad`"));
    }
}
