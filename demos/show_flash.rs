use navcfg::mapping::update;
use navcfg::{DataId, Device, ImageDevice, registry};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or("device.img".to_string());
    let device = ImageDevice::open_or_create(&path)?;
    let table = registry()
        .get(DataId::FLASH_CONFIG)
        .ok_or("no flash configuration layout")?;
    let record = device.get_record(DataId::FLASH_CONFIG)?;
    println!("Image: {}", device.name());
    for entry in update::display(table, &record)? {
        println!("{}", entry);
    }
    Ok(())
}
