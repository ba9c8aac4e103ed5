//! Car lookup and admin CRUD.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};
use rental_core::services::cars;
use rental_core::types::{Car, CreateCarRequest, UpdateCarRequest};
use serde::de::DeserializeOwned;

use super::{Context, money};

pub async fn show(ctx: &Context, id: &str) -> Result<()> {
    let car = cars::get_car(ctx.client(), id)
        .await
        .with_context(|| format!("load car {id}"))?;
    ctx.output.emit(&car, print_car)
}

pub async fn create(ctx: &Context, file: &Path) -> Result<()> {
    let request: CreateCarRequest = read_json(file)?;
    let car = cars::create_car(ctx.client(), &request)
        .await
        .context("create car")?;
    ctx.output.emit(&car, |car| println!("Created car {}", car.id))
}

pub async fn update(ctx: &Context, id: &str, file: &Path) -> Result<()> {
    let update: UpdateCarRequest = read_json(file)?;
    let car = cars::update_car(ctx.client(), id, &update)
        .await
        .with_context(|| format!("update car {id}"))?;
    ctx.output.emit(&car, print_car)
}

pub async fn delete(ctx: &Context, id: &str) -> Result<()> {
    cars::delete_car(ctx.client(), id)
        .await
        .with_context(|| format!("delete car {id}"))?;
    println!("Deleted car {id}");
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}

fn print_car(car: &Car) {
    println!("{} {} {} ({})", car.year, car.brand, car.model, car.id);
    println!("name:         {}", car.name);
    println!("fuel:         {:?}", car.fuel_type);
    println!("transmission: {:?}", car.transmission);
    println!("seats:        {}", car.seats);
    println!("price:        {}/day", money(car.price_per_day));
    if let Some(location) = &car.location {
        println!("location:     {}, {}", location.address, location.city);
    }
    if !car.features.is_empty() {
        println!("features:     {}", car.features.join(", "));
    }
    if !car.is_active {
        println!("status:       inactive");
    }
}
