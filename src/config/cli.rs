use clap::{Args, Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "gestor-materias")]
#[command(about = "Course enrollment manager: students, teachers, courses and enrollments")]
pub struct Cli {
    /// Path to TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override storage.data_dir from the config
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Load teachers, students, courses and enrollments from a TOML seed file
    Seed {
        #[arg(long)]
        file: String,
    },

    /// Student administration
    #[command(subcommand)]
    Student(StudentCommand),

    /// Teacher administration
    #[command(subcommand)]
    Teacher(TeacherCommand),

    /// Course administration
    #[command(subcommand)]
    Course(CourseCommand),

    /// Enroll a student in a course
    Enroll(StudentCourseArgs),

    /// Check whether an enrollment would be accepted, without saving anything
    Check(StudentCourseArgs),

    /// Cancel an enrollment by id
    Cancel {
        #[arg(long)]
        enrollment: u64,
    },

    /// Cancel a student's active enrollment in a course
    Unenroll(StudentCourseArgs),

    /// Courses the student can still enroll in
    Available {
        #[arg(long)]
        student: u64,
    },

    /// Active enrollments of a student
    Enrollments {
        #[arg(long)]
        student: u64,
    },

    /// Students actively enrolled in a course
    Roster {
        #[arg(long)]
        course: u64,
    },

    /// Other students enrolled in the same course
    Classmates(StudentCourseArgs),

    /// Export the enrollment history as CSV
    Report {
        /// File name inside the data directory; prints to stdout when omitted
        #[arg(long)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct StudentCourseArgs {
    #[arg(long)]
    pub student: u64,

    #[arg(long)]
    pub course: u64,
}

#[derive(Debug, Clone, Args)]
pub struct PersonArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,
}

#[derive(Debug, Clone, Subcommand)]
pub enum StudentCommand {
    Add(PersonArgs),
    Update {
        #[arg(long)]
        id: u64,
        #[command(flatten)]
        person: PersonArgs,
    },
    Activate {
        #[arg(long)]
        id: u64,
    },
    Deactivate {
        #[arg(long)]
        id: u64,
    },
    Remove {
        #[arg(long)]
        id: u64,
    },
    List,
}

#[derive(Debug, Clone, Subcommand)]
pub enum TeacherCommand {
    Add(PersonArgs),
    Update {
        #[arg(long)]
        id: u64,
        #[command(flatten)]
        person: PersonArgs,
    },
    Remove {
        #[arg(long)]
        id: u64,
    },
    List {
        /// Only teachers that can take another course
        #[arg(long)]
        with_capacity: bool,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum CourseCommand {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        teacher: u64,
    },
    Update {
        #[arg(long)]
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        teacher: Option<u64>,
    },
    Remove {
        #[arg(long)]
        id: u64,
    },
    List,
}

impl Command {
    /// Read-only commands never rewrite the state file.
    pub fn is_read_only(&self) -> bool {
        match self {
            Command::Check(_)
            | Command::Available { .. }
            | Command::Enrollments { .. }
            | Command::Roster { .. }
            | Command::Classmates(_)
            | Command::Report { .. } => true,
            Command::Student(StudentCommand::List)
            | Command::Teacher(TeacherCommand::List { .. })
            | Command::Course(CourseCommand::List) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enroll() {
        let cli = Cli::try_parse_from([
            "gestor-materias",
            "--data-dir",
            "/tmp/x",
            "enroll",
            "--student",
            "1",
            "--course",
            "2",
        ])
        .unwrap();
        assert_eq!(cli.data_dir.as_deref(), Some("/tmp/x"));
        match cli.command {
            Command::Enroll(args) => {
                assert_eq!(args.student, 1);
                assert_eq!(args.course, 2);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_nested_course_update() {
        let cli = Cli::try_parse_from([
            "gestor-materias",
            "course",
            "update",
            "--id",
            "4",
            "--teacher",
            "9",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Command::Course(CourseCommand::Update {
                id: 4,
                name: None,
                teacher: Some(9),
                ..
            })
        ));
        assert!(!cli.command.is_read_only());
    }

    #[test]
    fn test_listing_is_read_only() {
        let cli = Cli::try_parse_from(["gestor-materias", "teacher", "list", "--with-capacity"])
            .unwrap();
        assert!(cli.command.is_read_only());
    }
}
