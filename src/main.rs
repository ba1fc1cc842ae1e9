use anticipator_waitlist::config::get_configuration;
use anticipator_waitlist::startup::Application;
use anticipator_waitlist::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(
        String::from("anticipator_waitlist"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber);

    let config = get_configuration().expect("Missing configuration file.");
    let application = Application::build(config).await?;

    application.run_until_stop().await
}
