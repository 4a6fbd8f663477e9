use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use services::{
    AdminError, ApiError, AppServices, CatalogView, ErrorDisplay, ProgressSave, SessionError,
};
use tutorial_core::catalog::{CatalogQuery, SortKey};
use tutorial_core::learning::LearningItem;
use tutorial_core::media::MediaKind;
use tutorial_core::model::{
    Credentials, RegistrationForm, Role, Step, Tutorial, TutorialDraft, TutorialId, UserId,
    UserPatch,
};
use tutorial_core::time::short_date;
use tutorial_core::user_query::UserQuery;
use tutorial_core::walkthrough::{Walkthrough, WalkthroughPhase};

pub enum Command {
    Catalog(CatalogQuery),
    Show(TutorialId),
    Learn(TutorialId),
    Login {
        credentials: Credentials,
        admin: bool,
    },
    Register(RegistrationForm),
    Logout,
    WhoAmI,
    Progress,
    Admin(AdminCommand),
}

pub enum AdminCommand {
    Stats,
    Tutorials(SortKey),
    CreateTutorial(TutorialDraft),
    Toggle(TutorialId),
    DeleteTutorial(TutorialId),
    Steps(TutorialId),
    MoveStep {
        id: TutorialId,
        index: usize,
        up: bool,
    },
    Users(UserQuery),
    SetRole {
        id: UserId,
        role: Role,
    },
    DeleteUser(UserId),
    Upload {
        kind: MediaKind,
        path: PathBuf,
    },
}

type CmdResult = Result<(), Box<dyn Error>>;

/// A message meant for the person at the terminal.
#[derive(Debug)]
struct Failure(String);

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for Failure {}

fn api_failure(err: &ApiError) -> Box<dyn Error> {
    let text = match err.display() {
        ErrorDisplay::Toast(message) => message,
        ErrorDisplay::Inline(errors) => errors
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("\n"),
    };
    Box::new(Failure(text))
}

fn session_failure(err: SessionError) -> Box<dyn Error> {
    match err {
        SessionError::Api(api) => api_failure(&api),
        SessionError::SignedOut => Box::new(Failure("Silakan masuk terlebih dahulu.".into())),
        SessionError::NotAdmin => Box::new(Failure("Akun ini tidak memiliki akses admin.".into())),
        other => other.into(),
    }
}

fn admin_failure(err: AdminError) -> Box<dyn Error> {
    match err {
        AdminError::Api(api) => api_failure(&api),
        AdminError::Forbidden => Box::new(Failure("Perintah ini khusus admin.".into())),
        other => other.into(),
    }
}

pub async fn execute(services: &AppServices, command: Command) -> CmdResult {
    match command {
        Command::Catalog(query) => catalog(services, &query).await,
        Command::Show(id) => show(services, &id).await,
        Command::Learn(id) => learn(services, &id).await,
        Command::Login { credentials, admin } => login(services, credentials, admin).await,
        Command::Register(form) => {
            let session = services
                .auth()
                .register_and_login(form)
                .await
                .map_err(session_failure)?;
            println!("Akun dibuat. Masuk sebagai {}.", session.user.display_name());
            Ok(())
        }
        Command::Logout => {
            services.auth().logout().await?;
            println!("Berhasil keluar.");
            Ok(())
        }
        Command::WhoAmI => whoami(services).await,
        Command::Progress => progress(services).await,
        Command::Admin(command) => admin(services, command).await,
    }
}

//
// ─── BROWSING ──────────────────────────────────────────────────────────────────
//

fn tutorial_row(tutorial: &Tutorial, status: &str) {
    println!(
        "{:<16} {:<36} {:<18} {:<9} {:>10}  {}",
        tutorial.id.as_str(),
        tutorial.title,
        tutorial.category.as_str(),
        tutorial.difficulty.as_str(),
        tutorial.duration_label(),
        status
    );
}

async fn catalog(services: &AppServices, query: &CatalogQuery) -> CmdResult {
    match services.catalog().load(query).await {
        CatalogView::Failed(err) => Err(api_failure(&err)),
        CatalogView::Loaded(page) if page.tutorials.is_empty() => {
            println!("Tidak ada tutorial yang cocok.");
            Ok(())
        }
        CatalogView::Loaded(page) => {
            for tutorial in &page.tutorials {
                let status = page
                    .progress
                    .as_ref()
                    .map_or("", |p| p.status_of(&tutorial.id).as_str());
                tutorial_row(tutorial, status);
            }
            println!("{} dari {} tutorial", page.tutorials.len(), page.fetched);
            Ok(())
        }
    }
}

async fn show(services: &AppServices, id: &TutorialId) -> CmdResult {
    let walkthrough = services.walkthrough().open(id).await;
    let Some(tutorial) = walkthrough.tutorial() else {
        return Err(Box::new(Failure("Tutorial tidak ditemukan.".into())));
    };
    let media = services.media();

    println!("{}", tutorial.title);
    println!(
        "{} | {} | {} | oleh {}",
        tutorial.category,
        tutorial.difficulty.as_str(),
        tutorial.duration_label(),
        tutorial.author
    );
    println!("{}", tutorial.description);
    if !tutorial.image_url.is_empty() {
        println!("Gambar: {}", media.url_for(MediaKind::Image, &tutorial.image_url));
    }
    if let Some(video) = &tutorial.video_url {
        println!("Video: {}", media.url_for(MediaKind::Video, video));
    }
    if !tutorial.materials.is_empty() {
        println!("\nBahan:");
        for material in &tutorial.materials {
            println!("  - {} ({})", material.name, material.quantity);
        }
    }
    println!("\nLangkah:");
    for step in &tutorial.steps {
        println!("  {}. {}", step.step_number, step.title);
    }
    if services.context().is_authenticated() {
        println!(
            "\nProgres: {}% ({})",
            walkthrough.percent_rounded(),
            walkthrough.step_label()
        );
    }
    Ok(())
}

//
// ─── WALKTHROUGH ───────────────────────────────────────────────────────────────
//

fn render(walkthrough: &Walkthrough) {
    match walkthrough.phase() {
        WalkthroughPhase::Completed => {
            println!("\nSelesai! Semua langkah telah dilalui. (100%)");
            println!("g <n> untuk meninjau langkah, r untuk mengulang, q untuk keluar.");
        }
        WalkthroughPhase::Active { .. } => {
            if let Some(step) = walkthrough.current_step() {
                println!(
                    "\n{}  [{}%]",
                    walkthrough.step_label(),
                    walkthrough.percent_rounded()
                );
                println!("{}", step.title);
                println!("{}", step.description);
                if let Some(note) = &step.safety_note {
                    println!("Perhatian: {note}");
                }
            }
        }
        WalkthroughPhase::Loading | WalkthroughPhase::NotFound => {}
    }
}

/// Saves run one after another; the chain resolves to the number that failed.
fn chain_save(previous: Option<JoinHandle<usize>>, save: ProgressSave) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let failed_before = match previous {
            Some(handle) => handle.await.unwrap_or(1),
            None => 0,
        };
        failed_before + usize::from(save.run().await.is_err())
    })
}

async fn learn(services: &AppServices, id: &TutorialId) -> CmdResult {
    let flow = services.walkthrough();
    let mut walkthrough = flow.open(id).await;
    if walkthrough.phase() == WalkthroughPhase::NotFound {
        return Err(Box::new(Failure("Tutorial tidak ditemukan.".into())));
    }
    if !services.context().is_authenticated() {
        println!("Belum masuk: progres tidak akan disimpan.");
    }
    render(&walkthrough);

    let mut in_flight: Option<JoinHandle<usize>> = None;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let words: Vec<&str> = line.split_whitespace().collect();
        let outcome = match words.as_slice() {
            [] | ["n" | "next"] => flow.advance(&mut walkthrough),
            ["p" | "prev"] => flow.retreat(&mut walkthrough),
            ["r" | "restart"] => flow.restart(&mut walkthrough),
            ["g" | "go", n] => match n.parse::<u32>() {
                Ok(n) if n > 0 => flow.jump_to(&mut walkthrough, n - 1),
                _ => {
                    println!("Nomor langkah tidak valid: {n}");
                    continue;
                }
            },
            ["q" | "quit"] => break,
            _ => {
                println!("Perintah: n(ext), p(rev), g <n>, r(estart), q(uit)");
                continue;
            }
        };
        match outcome {
            Ok(outcome) => {
                if let Some(save) = outcome.save {
                    in_flight = Some(chain_save(in_flight.take(), save));
                }
                render(&walkthrough);
            }
            Err(err) => println!("{err}"),
        }
    }

    if let Some(chain) = in_flight {
        let failed = chain.await.unwrap_or(1);
        if failed > 0 {
            println!("{failed} pembaruan progres gagal disimpan.");
        }
    }
    Ok(())
}

//
// ─── ACCOUNT ───────────────────────────────────────────────────────────────────
//

async fn login(services: &AppServices, credentials: Credentials, admin: bool) -> CmdResult {
    let auth = services.auth();
    let session = if admin {
        auth.admin_login(credentials).await
    } else {
        auth.login(credentials).await
    }
    .map_err(session_failure)?;
    println!(
        "Masuk sebagai {} ({}).",
        session.user.display_name(),
        session.user.role.as_str()
    );
    Ok(())
}

async fn whoami(services: &AppServices) -> CmdResult {
    if !services.context().is_authenticated() {
        println!("Belum masuk.");
        return Ok(());
    }
    let user = services
        .auth()
        .refresh_profile()
        .await
        .map_err(session_failure)?;
    println!("{} (@{})", user.display_name(), user.username);
    println!("Email: {}", user.email);
    println!("Peran: {}", user.role.as_str());
    println!("Karang Taruna: {}", user.profile.karang_taruna_name);
    println!("Alamat: {}", user.profile.address.one_line());
    if let Some(level) = user.profile.skill_level {
        println!("Keahlian: {}", level.as_str());
    }
    if let Some(joined) = user.created_at {
        println!("Bergabung: {}", short_date(joined));
    }
    Ok(())
}

fn learning_row(item: &LearningItem) {
    let updated = item.updated_at.map(short_date).unwrap_or_default();
    println!(
        "  {:<36} {}/{} langkah  {:>5.1}%  {}",
        item.title, item.completed_steps, item.total_steps, item.percent, updated
    );
}

async fn progress(services: &AppServices) -> CmdResult {
    let overview = services
        .learning()
        .overview()
        .await
        .map_err(session_failure)?;
    if overview.is_empty() {
        println!("Belum ada tutorial yang dipelajari.");
        return Ok(());
    }
    println!("Sedang dipelajari ({}):", overview.in_progress.len());
    overview.in_progress.iter().for_each(learning_row);
    println!("Selesai ({}):", overview.completed.len());
    overview.completed.iter().for_each(learning_row);
    Ok(())
}

//
// ─── ADMIN ─────────────────────────────────────────────────────────────────────
//

fn print_steps(tutorial_id: &TutorialId, steps: &[Step]) {
    println!("Langkah {tutorial_id}:");
    for step in steps {
        println!("  {}. {}", step.step_number, step.title);
    }
}

async fn admin(services: &AppServices, command: AdminCommand) -> CmdResult {
    let admin = services.admin();
    match command {
        AdminCommand::Stats => {
            let stats = admin.dashboard_stats().await.map_err(admin_failure)?;
            println!("Pengguna: {}", stats.total_users);
            println!("Tutorial: {}", stats.total_tutorials);
            println!("Progres:  {}", stats.total_progress);
        }
        AdminCommand::Tutorials(sort) => {
            for tutorial in admin.tutorials(sort).await.map_err(admin_failure)? {
                let state = if tutorial.is_active { "aktif" } else { "nonaktif" };
                tutorial_row(&tutorial, state);
            }
        }
        AdminCommand::CreateTutorial(draft) => {
            let created = admin.create_tutorial(draft).await.map_err(admin_failure)?;
            println!("Tutorial dibuat: {}", created.id);
        }
        AdminCommand::Toggle(id) => {
            let tutorial = admin.tutorial(&id).await.map_err(admin_failure)?;
            let updated = admin.toggle_active(&tutorial).await.map_err(admin_failure)?;
            let state = if updated.is_active { "aktif" } else { "nonaktif" };
            println!("{} sekarang {state}.", updated.title);
        }
        AdminCommand::DeleteTutorial(id) => {
            admin.delete_tutorial(&id).await.map_err(admin_failure)?;
            println!("Tutorial {id} dihapus.");
        }
        AdminCommand::Steps(id) => {
            let steps = admin.open_steps(&id).await.map_err(admin_failure)?;
            print_steps(steps.tutorial_id(), steps.steps());
        }
        AdminCommand::MoveStep { id, index, up } => {
            let mut steps = admin.open_steps(&id).await.map_err(admin_failure)?;
            let moved = if up {
                steps.move_up(index)
            } else {
                steps.move_down(index)
            };
            moved.map_err(|e| admin_failure(e.into()))?;
            let saved = admin.save_steps(&mut steps).await.map_err(admin_failure)?;
            print_steps(&saved.id, &saved.steps);
        }
        AdminCommand::Users(query) => {
            for user in admin.users(&query).await.map_err(admin_failure)? {
                println!(
                    "{:<14} {:<24} {:<28} {:<10} {}",
                    user.id.as_str(),
                    user.display_name(),
                    user.email,
                    user.role.as_str(),
                    user.profile.karang_taruna_name
                );
            }
        }
        AdminCommand::SetRole { id, role } => {
            let updated = admin.update_user(&id, &UserPatch::role(role)).await.map_err(admin_failure)?;
            println!("{} sekarang {}.", updated.display_name(), updated.role.as_str());
        }
        AdminCommand::DeleteUser(id) => {
            admin.delete_user(&id).await.map_err(admin_failure)?;
            println!("Pengguna {id} dihapus.");
        }
        AdminCommand::Upload { kind, path } => {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|e| Failure(format!("{}: {e}", path.display())))?;
            let uploaded = services
                .media()
                .upload(kind, &file_name, bytes)
                .await
                .map_err(admin_failure)?;
            println!("{}", uploaded.url);
            println!("public id: {}", uploaded.public_id);
        }
    }
    Ok(())
}
