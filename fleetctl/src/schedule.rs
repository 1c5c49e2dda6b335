use crate::args::{ScheduleCommands, ScheduleCreateArgs, ScheduleUpdateArgs};
use crate::context::Context;
use fleet_common::clock::system_clock;
use fleet_schedule::ScheduleManager;
use fleet_types::{ScheduleTarget, ScheduleUpdate};
use std::sync::Arc;

pub async fn run(ctx: &Context, cmd: &ScheduleCommands) -> anyhow::Result<()> {
    let manager = ScheduleManager::new(Arc::new(ctx.store.clone()));
    let clock = system_clock();

    match cmd {
        ScheduleCommands::Create(args) => {
            let schedule = create(&manager, args).await?;
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
        ScheduleCommands::Get { schedule_id } => {
            let Some(schedule) = manager.get(schedule_id).await? else {
                anyhow::bail!("schedule {schedule_id} not found");
            };
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
        ScheduleCommands::List { enabled_only, cluster_name, nodegroup_name } => {
            let schedules = manager.list(*enabled_only, cluster_name.as_deref(), nodegroup_name.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&schedules)?);
        }
        ScheduleCommands::Update(args) => {
            let patch = ScheduleUpdate {
                recurrence: args.recurrence.clone(),
                time_zone: args.time_zone.clone(),
                desired: args.desired,
                min: args.min,
                max: args.max,
                enabled: args.enabled,
                paused_until: None,
            };
            let schedule = manager.update(&args.schedule_id, &patch, clock.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
        ScheduleCommands::Delete { schedule_id } => {
            manager.delete(schedule_id, clock.as_ref()).await?;
            println!("{{\"schedule_id\": \"{schedule_id}\", \"deleted\": true}}");
        }
        ScheduleCommands::Pause { schedule_id, until } => {
            let schedule = manager.pause(schedule_id, *until, clock.as_ref()).await?;
            println!("{}", serde_json::to_string_pretty(&schedule)?);
        }
        ScheduleCommands::History { schedule_id, limit } => {
            let history = manager.history(schedule_id, *limit).await?;
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }
    Ok(())
}

async fn create(manager: &ScheduleManager, args: &ScheduleCreateArgs) -> anyhow::Result<fleet_types::Schedule> {
    let clock = system_clock();
    let target = ScheduleTarget {
        account_id: args.account_id.clone(),
        region: args.region.clone(),
        cluster_name: args.cluster_name.clone(),
        nodegroup_name: args.nodegroup_name.clone(),
    };
    let schedule = manager
        .create(&args.name, &args.recurrence, &args.time_zone, args.desired, args.min, args.max, target, &args.created_by, clock.as_ref())
        .await?;
    Ok(schedule)
}
