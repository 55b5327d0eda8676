mod health;
mod queue;
mod subscription;
mod worker;
