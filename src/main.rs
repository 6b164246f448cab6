use anyhow::Result;
use futures_lite::stream::StreamExt;
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
};
use log::{error, info, warn};
use serde::Serialize;
use swarmload::types::Metric;
use swarmload::{LoadTestRunner, PlanError, RunState, TestPlan, WorkerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    info!("🚀 Swarmload worker starting...");

    let config = WorkerConfig::from_env();

    info!("📡 Connecting to RabbitMQ at {}", config.rabbitmq_url);

    let conn = Connection::connect(&config.rabbitmq_url, ConnectionProperties::default()).await?;
    let channel = conn.create_channel().await?;

    info!("✅ Connected to RabbitMQ successfully");

    for queue in [
        &config.plans_queue,
        &config.results_queue,
        &config.metrics_queue,
    ] {
        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
    }

    let runner = LoadTestRunner::new(&config.executor)?;

    let stopper = runner.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if stopper.state() == RunState::Running {
                warn!("Ctrl-C received, stopping the current test");
                stopper.stop();
            } else {
                info!("👋 Worker shutting down");
                std::process::exit(0);
            }
        }
    });

    info!("🎧 Waiting for test plans on {}...", config.plans_queue);

    let mut consumer = channel
        .basic_consume(
            &config.plans_queue,
            "swarmload_worker",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    // Plans run one at a time; the runner tracks a single run.
    while let Some(delivery) = consumer.next().await {
        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                error!("❌ Consumer error: {}", e);
                continue;
            }
        };

        let payload = String::from_utf8_lossy(&delivery.data);
        info!("📨 Received test plan ({} bytes)", payload.len());

        let plan = match TestPlan::from_json(&payload) {
            Ok(plan) => plan,
            Err(e) => {
                match &e {
                    PlanError::Parse(_) => error!("❌ Failed to parse test plan: {}", e),
                    PlanError::Invalid(_) => error!("❌ Invalid test plan: {}", e),
                }
                if let Err(e) = delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await
                {
                    error!("❌ Failed to nack: {}", e);
                }
                continue;
            }
        };

        match runner.run_plan(&plan).await {
            Ok(report) => {
                let metric = Metric::from_report(&report, plan.total_users());
                if let Err(e) = publish(&channel, &config.results_queue, &report).await {
                    error!("❌ Failed to publish result for {}: {}", report.run_id, e);
                } else {
                    info!("📤 Test result sent to {}", config.results_queue);
                }
                if let Err(e) = publish(&channel, &config.metrics_queue, &metric).await {
                    error!("❌ Failed to publish metric for {}: {}", report.run_id, e);
                }
            }
            Err(e) => error!("❌ Load test {} failed validation: {}", plan.name, e),
        }

        if let Err(e) = delivery.ack(BasicAckOptions::default()).await {
            error!("❌ Failed to ack: {}", e);
        }
    }

    Ok(())
}

async fn publish<T: Serialize>(channel: &Channel, queue: &str, message: &T) -> Result<()> {
    let payload = serde_json::to_vec(message)?;
    channel
        .basic_publish(
            "",
            queue,
            BasicPublishOptions::default(),
            &payload,
            BasicProperties::default(),
        )
        .await?;
    Ok(())
}
