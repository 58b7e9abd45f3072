use crate::infra::{parse_acceptance_mode, Platform, TokenDirectory};
use clap::Args;
use volunteer_hub::error::AppError;
use volunteer_hub::identity::UserId;
use volunteer_hub::workflows::applications::{
    AcceptanceMode, ApplicationStatus, NewOpportunity,
};
use volunteer_hub::workflows::progression::{Quest, QuestFacts};

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Slots on the demo opportunity
    #[arg(long, default_value_t = 1)]
    pub(crate) slots: u32,
    /// Number of students applying, in order
    #[arg(long, default_value_t = 2)]
    pub(crate) applicants: usize,
    /// Hours the first accepted student logs and gets verified
    #[arg(long, default_value_t = 5.0)]
    pub(crate) hours: f64,
    /// Capacity enforcement: atomic or read_then_write
    #[arg(long, value_parser = parse_acceptance_mode, default_value = "atomic")]
    pub(crate) acceptance_mode: AcceptanceMode,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        slots,
        applicants,
        hours,
        acceptance_mode,
    } = args;

    let platform = Platform::in_memory(acceptance_mode, TokenDirectory::default());

    println!("Volunteer hub demo");
    println!("Acceptance mode: {}", acceptance_mode.label());

    let opportunity = platform.applications.post_opportunity(NewOpportunity {
        title: "Saturday food bank shift".to_string(),
        organization: "Eastside Pantry".to_string(),
        slots: Some(slots),
        fcfs: true,
    })?;
    println!(
        "\nPosted {} ({}) for {} with {} first-come slot(s)",
        opportunity.title, opportunity.id, opportunity.organization, slots
    );

    let mut first_accepted = None;
    for index in 1..=applicants {
        let student = UserId(format!("student-{index:02}"));
        let application = platform.applications.apply(&student, &opportunity.id)?;
        println!(
            "  {:<12} {:<12} {}",
            student, application.id, application.status
        );
        if application.status == ApplicationStatus::Accepted && first_accepted.is_none() {
            first_accepted = Some((student, application.id));
        }
    }

    let accepted = platform
        .applications
        .list_for_opportunity(&opportunity.id)?
        .into_iter()
        .filter(|application| application.status == ApplicationStatus::Accepted)
        .count();
    println!("Accepted {accepted} of {slots} slot(s)");

    let Some((student, application_id)) = first_accepted else {
        println!("\nNo student was auto-accepted; skipping hours and quests.");
        return Ok(());
    };

    platform
        .applications
        .log_hours(&application_id, &student, hours)?;
    let completed = platform.applications.verify_hours(&application_id, hours)?;
    let total_hours = platform.applications.total_verified_hours(&student)?;
    println!(
        "\n{student} logged {hours:.1}h; application {} is {}",
        completed.id, completed.status
    );

    let facts = QuestFacts {
        full_name: "Demo Student".to_string(),
        interests: "food security".to_string(),
        email_verified: true,
        total_hours,
        applied_count: 1,
        ..QuestFacts::default()
    };

    println!("\nQuests for {student}");
    let quests = platform.progression.quests(&student, &facts)?;
    render_quests(&quests);

    println!("\nClaiming completed quests");
    for quest in quests.iter().filter(|quest| quest.claimable()) {
        let receipt = platform.progression.claim(&student, &quest.key, &facts)?;
        match &receipt.badge_granted {
            Some(badge) => println!(
                "  {:<14} +{} XP, badge: {}",
                receipt.quest, receipt.xp_awarded, badge.label
            ),
            None => println!("  {:<14} +{} XP", receipt.quest, receipt.xp_awarded),
        }
    }

    let progress = platform.progression.progress(&student, total_hours)?;
    println!(
        "\nLevel {} ({} XP total, {}/{} into the level)",
        progress.level, progress.xp, progress.xp_in_level, progress.max_xp_per_level
    );

    let badges = platform.progression.badges(&student)?;
    if !badges.is_empty() {
        let labels: Vec<_> = badges.iter().map(|badge| badge.label.as_str()).collect();
        println!("Badges: {}", labels.join(", "));
    }

    let notifications = platform.notifications.events();
    println!("\nNotifications sent: {}", notifications.len());
    for notification in notifications {
        println!(
            "  {:<22} -> {} ({})",
            notification.template, notification.recipient, notification.application_id
        );
    }

    Ok(())
}

fn render_quests(quests: &[Quest]) {
    for quest in quests {
        let marker = if quest.claimed {
            "claimed"
        } else if quest.is_done {
            "ready"
        } else {
            "open"
        };
        println!(
            "  [{:<7}] {:<14} {:>3} XP  {}",
            marker, quest.key, quest.xp_reward, quest.title
        );
    }
}
