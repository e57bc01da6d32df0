use crate::infra::{InMemoryProfileRepository, LoggingNotificationSink};
use chrono::{Local, NaiveDate};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use portal::error::AppError;
use portal::workflows::onboarding::{
    AcademicData, ConsentFlags, CvDocument, Degree, HackathonApplication, IntakePolicy,
    OnboardingService, OrganizationalData, Profile, RegistrationSubmission, SectionData,
    SectionRegistry, SetupState, ShirtSize,
};
use portal::workflows::roster::{build_roster, export_csv};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Registration date used for age checks (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Write the roster CSV export to a file instead of stdout.
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

type DemoService = OnboardingService<InMemoryProfileRepository, LoggingNotificationSink>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let repository = Arc::new(InMemoryProfileRepository::default());
    let notifications = Arc::new(LoggingNotificationSink::default());
    let service = OnboardingService::new(
        SectionRegistry::standard(),
        repository.clone(),
        notifications.clone(),
        IntakePolicy::default(),
    );

    println!("Application portal demo");
    println!(
        "Setup sequence: {}",
        service
            .registry()
            .kinds()
            .map(|kind| kind.slug())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    let hacker = register(&service, "hackerman", "hackerman@example.org", today)?;
    walk_setup(&service, &hacker)?;

    let partial = register(&service, "latecomer", "latecomer@example.org", today)?;
    service.submit_section(&partial, academic())?;
    print_next_step(&service, &partial)?;

    println!("\nAdministrative decisions");
    let status = service.set_approval("hackerman", true)?;
    println!("  hackerman: {}", status.label());
    service.rsvp(&hacker, true)?;
    println!("  hackerman RSVP: going");

    println!("\nRoster snapshot");
    let rows = build_roster(repository.as_ref(), service.resolver())?;
    for row in &rows {
        println!(
            "  {:<10} setup={:<5} approval={:<8} next={}",
            row.username,
            row.setup_completed,
            row.approval,
            row.first_incomplete.unwrap_or("-"),
        );
    }

    let csv = export_csv(&rows)?;
    match args.output {
        Some(path) => {
            std::fs::write(&path, &csv)?;
            println!("\nExport written to {}", path.display());
        }
        None => {
            println!("\nCSV export");
            print!("{}", String::from_utf8_lossy(&csv));
        }
    }

    println!("\n{} notice(s) queued", notifications.events().len());
    Ok(())
}

fn register(
    service: &DemoService,
    username: &str,
    email: &str,
    today: NaiveDate,
) -> Result<Profile, AppError> {
    let submission = RegistrationSubmission {
        username: username.to_string(),
        password: "correct-horse-battery".to_string(),
        password_confirmation: "correct-horse-battery".to_string(),
        first_name: "Huber".to_string(),
        middle_name: None,
        last_name: "Ackerman".to_string(),
        date_of_birth: today - chrono::Duration::days(25 * 365),
        gender: "Prefer Not to Answer".to_string(),
        email: email.to_string(),
        phone: None,
        country_of_residence: "Germany".to_string(),
        consent: ConsentFlags {
            event_terms: true,
            code_of_conduct: true,
            contest_terms: true,
            sharing_consent: true,
        },
    };

    let (profile, _) = service.register(submission, today)?;
    println!("\nRegistered '{}' ({})", profile.username, profile.email);
    Ok(profile)
}

fn walk_setup(service: &DemoService, profile: &Profile) -> Result<(), AppError> {
    for payload in [academic(), application(), organizational(), cv()] {
        print_next_step(service, profile)?;
        let kind = payload.kind();
        service.submit_section(profile, payload)?;
        println!("  submitted '{}'", kind.slug());
    }
    print_next_step(service, profile)?;
    Ok(())
}

fn print_next_step(service: &DemoService, profile: &Profile) -> Result<(), AppError> {
    match service.next_step(profile)? {
        SetupState::Finished => println!("  {}: setup finished", profile.username),
        SetupState::Pending { section } => println!(
            "  {}: next step '{}' ({})",
            profile.username,
            section.kind.slug(),
            section.title
        ),
    }
    Ok(())
}

fn academic() -> SectionData {
    SectionData::Academic(AcademicData {
        university: "Constructor University".to_string(),
        degree: Degree::BachelorOfScience,
        major: "Computer Science".to_string(),
        graduation_year: 2027,
    })
}

fn application() -> SectionData {
    SectionData::Application(HackathonApplication {
        motivation: "Build something useful with new people.".to_string(),
        portfolio: "https://github.com/hackerman".to_string(),
        first_hackathon: true,
    })
}

fn organizational() -> SectionData {
    SectionData::Organizational(OrganizationalData {
        shirt_size: ShirtSize::M,
        need_visa: false,
        need_reimbursement: true,
        dietary_requirements: "Vegetarian".to_string(),
        comments: String::new(),
    })
}

fn cv() -> SectionData {
    SectionData::Cv(CvDocument {
        filename: "cv.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        data: b"%PDF-1.4 demo".to_vec(),
    })
}
