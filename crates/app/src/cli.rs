use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use tutorial_core::catalog::{CatalogQuery, SortKey};
use tutorial_core::media::MediaKind;
use tutorial_core::model::{
    Category, Credentials, Difficulty, ProgressStatus, RegistrationForm, Role, SkillLevel,
    TutorialDraft, TutorialId, UserId,
};
use tutorial_core::user_query::UserQuery;

use crate::commands::{AdminCommand, Command};

#[derive(Debug, Parser)]
#[command(name = "tutorials", about = "Browse and follow how-to tutorials", long_about = None)]
#[command(after_help = "Environment: TUTORIAL_API_URL, TUTORIAL_SESSION_DB, \
    TUTORIAL_MEDIA_CLOUD_NAME, TUTORIAL_PROGRESS_RETRIES, RUST_LOG")]
pub struct Cli {
    /// Backend origin, overrides TUTORIAL_API_URL
    #[arg(long)]
    pub api: Option<String>,

    /// SQLite URL or path of the session store, overrides TUTORIAL_SESSION_DB
    #[arg(long = "db")]
    pub db_url: Option<String>,

    /// Run against a built-in demo catalog; nothing leaves the process
    #[arg(long)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List tutorials
    Catalog(CatalogArgs),
    /// Show one tutorial
    Show { id: TutorialId },
    /// Walk through a tutorial step by step: n(ext), p(rev), g <n>, r(estart), q(uit)
    Learn { id: TutorialId },
    /// Sign in; put --admin before the email
    Login {
        email: String,
        #[arg(allow_hyphen_values = true)]
        password: String,
        /// Require an admin account
        #[arg(long)]
        admin: bool,
    },
    Register(RegisterArgs),
    Logout,
    #[command(name = "whoami")]
    WhoAmI,
    /// Show your learning progress
    Progress,
    Admin {
        #[command(subcommand)]
        command: AdminCliCommand,
    },
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    #[arg(long, allow_hyphen_values = true)]
    search: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    category: Option<String>,
    #[arg(long)]
    difficulty: Option<Difficulty>,
    #[arg(long)]
    status: Option<ProgressStatus>,
    /// none, duration-asc, duration-desc, created-asc, created-desc
    #[arg(long, default_value = "none")]
    sort: SortKey,
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long, allow_hyphen_values = true)]
    name: String,
    #[arg(long, allow_hyphen_values = true)]
    username: String,
    #[arg(long, allow_hyphen_values = true)]
    email: String,
    #[arg(long, allow_hyphen_values = true)]
    password: String,
    /// Karang taruna name
    #[arg(long, allow_hyphen_values = true)]
    org: String,
    #[arg(long, allow_hyphen_values = true)]
    provinsi: String,
    #[arg(long, allow_hyphen_values = true)]
    kabupaten: String,
    #[arg(long, allow_hyphen_values = true)]
    kecamatan: String,
    #[arg(long, allow_hyphen_values = true)]
    jalan: String,
    #[arg(long, allow_hyphen_values = true)]
    phone: Option<String>,
    #[arg(long)]
    skill: Option<SkillLevel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Debug, Subcommand)]
pub enum AdminCliCommand {
    /// Dashboard counts
    Stats,
    Tutorials {
        #[arg(long, default_value = "none")]
        sort: SortKey,
    },
    Create(CreateTutorialArgs),
    /// Publish or unpublish a tutorial
    Toggle { id: TutorialId },
    DeleteTutorial { id: TutorialId },
    Steps { id: TutorialId },
    /// Move a step (1-based position) one place up or down
    MoveStep {
        id: TutorialId,
        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        position: u32,
        #[arg(value_enum)]
        direction: Direction,
    },
    Users {
        #[arg(long, allow_hyphen_values = true)]
        search: Option<String>,
        #[arg(long)]
        skill: Option<SkillLevel>,
        #[arg(long)]
        role: Option<Role>,
    },
    SetRole { id: UserId, role: Role },
    DeleteUser { id: UserId },
    /// Upload an image or video file
    Upload { kind: MediaKind, path: PathBuf },
}

#[derive(Debug, Args)]
pub struct CreateTutorialArgs {
    #[arg(long, allow_hyphen_values = true)]
    title: String,
    #[arg(long, allow_hyphen_values = true)]
    description: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    category: String,
    #[arg(long)]
    difficulty: String,
    /// Minutes
    #[arg(long)]
    duration: String,
    #[arg(long)]
    image: Option<String>,
    #[arg(long)]
    video: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    author: Option<String>,
}

impl CliCommand {
    pub fn into_command(self) -> Command {
        match self {
            Self::Catalog(args) => Command::Catalog(args.into_query()),
            Self::Show { id } => Command::Show(id),
            Self::Learn { id } => Command::Learn(id),
            Self::Login {
                email,
                password,
                admin,
            } => Command::Login {
                credentials: Credentials::new(email, password),
                admin,
            },
            Self::Register(args) => Command::Register(args.into_form()),
            Self::Logout => Command::Logout,
            Self::WhoAmI => Command::WhoAmI,
            Self::Progress => Command::Progress,
            Self::Admin { command } => Command::Admin(command.into_command()),
        }
    }
}

impl CatalogArgs {
    fn into_query(self) -> CatalogQuery {
        CatalogQuery::new()
            .with_search(self.search.unwrap_or_default())
            .with_category(self.category.as_deref().and_then(Category::selection))
            .with_difficulty(self.difficulty)
            .with_status(self.status)
            .with_sort(self.sort)
    }
}

impl RegisterArgs {
    /// The command line has no separate confirmation field.
    fn into_form(self) -> RegistrationForm {
        RegistrationForm {
            name: self.name,
            username: self.username,
            email: self.email,
            confirm_password: self.password.clone(),
            password: self.password,
            karang_taruna_name: self.org,
            provinsi: self.provinsi,
            kabupaten_kota: self.kabupaten,
            kecamatan: self.kecamatan,
            jalan: self.jalan,
            phone: self.phone.unwrap_or_default(),
            skill_level: self
                .skill
                .map(|level| level.as_str().to_owned())
                .unwrap_or_default(),
            ..RegistrationForm::default()
        }
    }
}

impl AdminCliCommand {
    fn into_command(self) -> AdminCommand {
        match self {
            Self::Stats => AdminCommand::Stats,
            Self::Tutorials { sort } => AdminCommand::Tutorials(sort),
            Self::Create(args) => AdminCommand::CreateTutorial(TutorialDraft {
                title: args.title,
                description: args.description.unwrap_or_default(),
                category: args.category,
                difficulty: args.difficulty,
                duration: args.duration,
                image_url: args.image.unwrap_or_default(),
                video_url: args.video.unwrap_or_default(),
                author: args.author.unwrap_or_default(),
            }),
            Self::Toggle { id } => AdminCommand::Toggle(id),
            Self::DeleteTutorial { id } => AdminCommand::DeleteTutorial(id),
            Self::Steps { id } => AdminCommand::Steps(id),
            Self::MoveStep {
                id,
                position,
                direction,
            } => AdminCommand::MoveStep {
                id,
                index: usize::try_from(position - 1).unwrap_or(usize::MAX),
                up: direction == Direction::Up,
            },
            Self::Users {
                search,
                skill,
                role,
            } => AdminCommand::Users(
                UserQuery::new()
                    .with_search(search.unwrap_or_default())
                    .with_skill_level(skill)
                    .with_role(role),
            ),
            Self::SetRole { id, role } => AdminCommand::SetRole { id, role },
            Self::DeleteUser { id } => AdminCommand::DeleteUser(id),
            Self::Upload { kind, path } => AdminCommand::Upload { kind, path },
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("tutorials").chain(args.iter().copied()))
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_come_before_the_command() {
        let cli = parse(&["--offline", "--api", "http://api.test", "catalog"]).unwrap();
        assert!(cli.offline);
        assert_eq!(cli.api.as_deref(), Some("http://api.test"));
        assert!(matches!(cli.command, CliCommand::Catalog(_)));
    }

    #[test]
    fn catalog_flags_build_a_query() {
        let cli = parse(&["catalog", "--category", "Plambing", "--sort", "duration-desc"]).unwrap();
        let Command::Catalog(query) = cli.command.into_command() else {
            panic!("expected catalog command");
        };
        assert_eq!(query.sort, SortKey::DurationDesc);
        assert_eq!(query.category, Category::selection("Plambing"));
        assert_eq!(query.status, None);
    }

    #[test]
    fn values_may_start_with_dashes() {
        let cli = parse(&["catalog", "--search", "--offline"]).unwrap();
        assert!(!cli.offline);
        let Command::Catalog(query) = cli.command.into_command() else {
            panic!("expected catalog command");
        };
        assert_eq!(query.search, "--offline");

        let cli = parse(&["login", "a@b.co", "-h"]).unwrap();
        let Command::Login { credentials, admin } = cli.command.into_command() else {
            panic!("expected login command");
        };
        assert_eq!(credentials.email, "a@b.co");
        assert_eq!(credentials.password, "-h");
        assert!(!admin);
    }

    #[test]
    fn login_admin_switch() {
        let cli = parse(&["login", "--admin", "a@b.c", "secret"]).unwrap();
        let Command::Login { credentials, admin } = cli.command.into_command() else {
            panic!("expected login command");
        };
        assert!(admin);
        assert_eq!(credentials.password, "secret");
    }

    #[test]
    fn bad_values_are_reported() {
        assert_eq!(
            parse(&["catalog", "--sort", "sideways"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
        assert_eq!(
            parse(&["catalog", "--nope"]).unwrap_err().kind(),
            ErrorKind::UnknownArgument
        );
        assert_eq!(
            parse(&["dance"]).unwrap_err().kind(),
            ErrorKind::InvalidSubcommand
        );
    }

    #[test]
    fn move_step_positions_are_one_based() {
        let cli = parse(&["admin", "move-step", "t1", "2", "up"]).unwrap();
        let Command::Admin(AdminCommand::MoveStep { index, up, .. }) = cli.command.into_command()
        else {
            panic!("expected move-step command");
        };
        assert_eq!(index, 1);
        assert!(up);
        assert_eq!(
            parse(&["admin", "move-step", "t1", "0", "up"]).unwrap_err().kind(),
            ErrorKind::ValueValidation
        );
    }

    #[test]
    fn register_fills_confirmation_and_skill() {
        let cli = parse(&[
            "register",
            "--name",
            "Sari",
            "--username",
            "sari",
            "--email",
            "sari@example.com",
            "--password",
            "-rahasia-",
            "--org",
            "KT Melati",
            "--provinsi",
            "Jawa Barat",
            "--kabupaten",
            "Bandung",
            "--kecamatan",
            "Coblong",
            "--jalan",
            "Jl. Dago 1",
            "--skill",
            "Mahir",
        ])
        .unwrap();
        let Command::Register(form) = cli.command.into_command() else {
            panic!("expected register command");
        };
        assert_eq!(form.password, "-rahasia-");
        assert_eq!(form.confirm_password, form.password);
        assert_eq!(form.skill_level, "Mahir");
        assert!(form.phone.is_empty());
    }
}
