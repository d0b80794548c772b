//! Hausbus automation controller daemon

use chrono::NaiveTime;
use hausbus_automation::rules::{
    AutoLightOnLogic, AutoPlugOnLogic, AutoPresenceOffLogic, AutoUsageOffLogic, DimmerByLuxLogic,
    TargetLux,
};
use hausbus_automation::{Controller, Trigger};
use hausbus_core::{Device, DeviceKind, NullCommandPort};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fixed house layout of this installation.
mod haus {
    use hausbus_core::PositionPath;

    pub fn bath() -> PositionPath {
        PositionPath::new("home", "upper", "bath")
    }

    pub fn office() -> PositionPath {
        PositionPath::new("home", "upper", "office")
    }

    pub fn hallway() -> PositionPath {
        PositionPath::new("home", "ground", "hallway")
    }

    pub fn kitchen() -> PositionPath {
        PositionPath::new("home", "ground", "kitchen")
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hausbusd=debug,hausbus_automation=debug,info".into()),
        )
        .init();

    tracing::info!("Starting hausbus controller");

    // TODO: swap in the serial BAOS command port once the gateway crate lands.
    let controller = Controller::builder()
        .command_port(Arc::new(NullCommandPort))
        .device(Device::new(DeviceKind::Light, haus::bath().with_device("top")))
        .device(Device::new(DeviceKind::Light, haus::bath().with_device("wall")))
        .device(Device::new(
            DeviceKind::PresenceSensor,
            haus::bath().with_device("pir"),
        ))
        .device(Device::new(
            DeviceKind::LuxSensor,
            haus::bath().with_device("lux"),
        ))
        .device(Device::new(
            DeviceKind::Dimmer,
            haus::office().with_device("desk"),
        ))
        .device(Device::new(
            DeviceKind::LuxSensor,
            haus::office().with_device("lux"),
        ))
        .device(Device::new(
            DeviceKind::PresenceSensor,
            haus::office().with_device("pir"),
        ))
        .device(Device::new(
            DeviceKind::Plug,
            haus::office().with_device("heater"),
        ))
        .device(Device::new(
            DeviceKind::Light,
            haus::hallway().with_device("top"),
        ))
        .device(Device::new(
            DeviceKind::Light,
            haus::kitchen().with_device("top"),
        ))
        .logic(AutoLightOnLogic::with_min_lux(150.0, vec![haus::bath()]))
        .logic(AutoPresenceOffLogic::at(
            Duration::from_secs(300),
            vec![haus::bath().with_device("top")],
        ))
        .logic(AutoPlugOnLogic::at(vec![haus::office()]))
        .logic(AutoUsageOffLogic::at(
            Duration::from_secs(90 * 60),
            vec![haus::office().with_device("heater")],
        ))
        .logic(DimmerByLuxLogic::at(
            TargetLux::Office,
            vec![haus::office().with_device("desk")],
        ))
        .tasks(|devices, tasks| {
            let hallway = haus::hallway().with_device("top");
            let on = devices.clone();
            let off = devices.clone();
            let on_path = hallway.clone();
            tasks.register("hallway.light.on", move || {
                on.turn_on(&on_path)?;
                Ok(())
            });
            tasks.register("hallway.light.off", move || {
                off.turn_off(&hallway)?;
                Ok(())
            });
        })
        .build()
        .await;

    controller
        .schedules()
        .register(
            "hallway.evening",
            Trigger::Daily {
                time: NaiveTime::from_hms_opt(18, 30, 0).expect("valid time"),
            },
            "hallway.light.on",
        )
        .await?;
    controller
        .schedules()
        .register(
            "hallway.night",
            Trigger::Daily {
                time: NaiveTime::from_hms_opt(23, 0, 0).expect("valid time"),
            },
            "hallway.light.off",
        )
        .await?;

    tracing::info!(
        "Controller running with {} logics and {} schedules",
        controller.logic().len(),
        controller.schedules().task_count()
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    controller.shutdown();
    Ok(())
}
