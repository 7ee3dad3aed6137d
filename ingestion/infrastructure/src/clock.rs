use chrono::{DateTime, Utc};
use ingestion_application::ports::Clock;
use shaku::Component;

#[derive(Component)]
#[shaku(interface = Clock)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
