//! Windows backend: cursor via `GetCursorPos`, screen via the Windows Graphics
//! Capture API, keys via `SendInput`.

use anyhow::{anyhow, Context, Result};
use image::{ImageBuffer, Rgba, RgbaImage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use windows::core::Interface;
use windows::Foundation::TypedEventHandler;
use windows::Graphics::Capture::{Direct3D11CaptureFramePool, GraphicsCaptureItem};
use windows::Graphics::DirectX::Direct3D11::IDirect3DDevice;
use windows::Graphics::DirectX::DirectXPixelFormat;
use windows::Win32::Foundation::{POINT, RECT};
use windows::Win32::Graphics::Direct3D::D3D_DRIVER_TYPE_HARDWARE;
use windows::Win32::Graphics::Direct3D11::{
    D3D11CreateDevice, ID3D11Device, ID3D11DeviceContext, ID3D11Resource, ID3D11Texture2D,
    D3D11_CPU_ACCESS_READ, D3D11_CREATE_DEVICE_BGRA_SUPPORT, D3D11_MAP_READ, D3D11_SDK_VERSION,
    D3D11_TEXTURE2D_DESC, D3D11_USAGE_STAGING,
};
use windows::Win32::Graphics::Gdi::{
    GetMonitorInfoW, MonitorFromPoint, HMONITOR, MONITORINFO, MONITOR_DEFAULTTONEAREST,
};
use windows::Win32::System::WinRT::Direct3D11::{
    CreateDirect3D11DeviceFromDXGIDevice, IDirect3DDxgiInterfaceAccess,
};
use windows::Win32::System::WinRT::Graphics::Capture::IGraphicsCaptureItemInterop;
use windows::Win32::UI::HiDpi::{
    SetProcessDpiAwarenessContext, DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, KEYBDINPUT, KEYBD_EVENT_FLAGS,
    KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, VIRTUAL_KEY, VK_LEFT, VK_RIGHT,
};
use windows::Win32::UI::WindowsAndMessaging::GetCursorPos;

use super::backend::{PageKey, ScreenAutomation};
use super::region::Region;

/// How long to wait for the first frame of a capture session.
const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

pub struct WindowsScreen {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
    d3d_device: IDirect3DDevice,
}

impl WindowsScreen {
    pub fn new() -> Result<Self> {
        unsafe {
            windows::Win32::System::WinRT::RoInitialize(
                windows::Win32::System::WinRT::RO_INIT_MULTITHREADED,
            )?;
            // Cursor positions and captured frames must share physical pixels.
            // Fails harmlessly if awareness was already set.
            let _ = SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
        }

        if !capture_supported() {
            return Err(crate::error::PipelineError::CaptureUnavailable(
                "Windows Graphics Capture is not supported on this system".to_string(),
            )
            .into());
        }

        let (device, context) = create_d3d11_device()?;
        let d3d_device = create_direct3d_device(&device)?;
        crate::log("D3D11 device created");

        Ok(Self {
            device,
            context,
            d3d_device,
        })
    }
}

fn capture_supported() -> bool {
    windows::Graphics::Capture::GraphicsCaptureSession::IsSupported().unwrap_or(false)
}

impl ScreenAutomation for WindowsScreen {
    fn cursor_position(&mut self) -> Result<(i32, i32)> {
        let mut pt = POINT::default();
        unsafe {
            GetCursorPos(&mut pt).map_err(|e| {
                crate::error::PipelineError::CaptureUnavailable(format!(
                    "cannot read the cursor position: {}",
                    e
                ))
            })?;
        }
        Ok((pt.x, pt.y))
    }

    fn take_screenshot(&mut self, region: &Region) -> Result<RgbaImage> {
        let (monitor, monitor_rect) = monitor_for(region)?;
        let crop = clip_to_monitor(region, &monitor_rect)?;

        let item = create_capture_item(monitor)?;
        let size = item.Size()?;

        let frame_pool = Direct3D11CaptureFramePool::CreateFreeThreaded(
            &self.d3d_device,
            DirectXPixelFormat::B8G8R8A8UIntNormalized,
            1,
            size,
        )?;
        let session = frame_pool.CreateCaptureSession(&item)?;
        // Keep the pointer out of the page image. Not available on older builds.
        let _ = session.SetIsCursorCaptureEnabled(false);

        let frame_arrived = Arc::new(AtomicBool::new(false));
        let frame_arrived_clone = frame_arrived.clone();
        frame_pool.FrameArrived(&TypedEventHandler::new(
            move |_pool: &Option<Direct3D11CaptureFramePool>, _| {
                frame_arrived_clone.store(true, Ordering::SeqCst);
                Ok(())
            },
        ))?;

        session.StartCapture()?;

        let start = std::time::Instant::now();
        while !frame_arrived.load(Ordering::SeqCst) {
            if start.elapsed() > FRAME_TIMEOUT {
                return Err(anyhow!("Timeout waiting for frame"));
            }
            std::thread::sleep(Duration::from_millis(10));
        }

        let frame = frame_pool.TryGetNextFrame()?;
        let surface = frame.Surface()?;
        let access: IDirect3DDxgiInterfaceAccess = surface.cast()?;
        let texture: ID3D11Texture2D = unsafe { access.GetInterface()? };

        let img = self.read_texture(&texture, &crop);

        session.Close()?;
        frame_pool.Close()?;

        img
    }

    fn send_key_pulse(&mut self, key: PageKey, hold: Duration) -> Result<()> {
        let vk = match key {
            PageKey::Left => VK_LEFT,
            PageKey::Right => VK_RIGHT,
        };

        // Arrow keys live on the extended part of the keyboard
        send_key(vk, KEYEVENTF_EXTENDEDKEY)?;
        if !hold.is_zero() {
            std::thread::sleep(hold);
        }
        send_key(vk, KEYEVENTF_EXTENDEDKEY | KEYEVENTF_KEYUP)
    }
}

/// Monitor-local crop rectangle, in pixels.
#[derive(Debug, PartialEq, Eq)]
struct Crop {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl WindowsScreen {
    /// Copies the frame texture to CPU memory and cuts out `crop`, BGRA -> RGBA.
    fn read_texture(&self, texture: &ID3D11Texture2D, crop: &Crop) -> Result<RgbaImage> {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        let staging_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.Width,
            Height: desc.Height,
            MipLevels: 1,
            ArraySize: 1,
            Format: desc.Format,
            SampleDesc: desc.SampleDesc,
            Usage: D3D11_USAGE_STAGING,
            BindFlags: Default::default(),
            CPUAccessFlags: D3D11_CPU_ACCESS_READ.0 as u32,
            MiscFlags: Default::default(),
        };

        let staging_texture = unsafe {
            let mut staging: Option<ID3D11Texture2D> = None;
            self.device
                .CreateTexture2D(&staging_desc, None, Some(&mut staging))?;
            staging.ok_or_else(|| anyhow!("Failed to create staging texture"))?
        };
        let staging_resource = staging_texture.cast::<ID3D11Resource>()?;

        unsafe {
            self.context
                .CopyResource(&staging_resource, &texture.cast::<ID3D11Resource>()?);
        }

        let mapped = unsafe {
            let mut mapped = Default::default();
            self.context
                .Map(&staging_resource, 0, D3D11_MAP_READ, 0, Some(&mut mapped))?;
            mapped
        };

        let src_data = unsafe {
            std::slice::from_raw_parts(
                mapped.pData as *const u8,
                (mapped.RowPitch * desc.Height) as usize,
            )
        };
        let row_pitch = mapped.RowPitch as usize;

        let mut img: ImageBuffer<Rgba<u8>, Vec<u8>> = ImageBuffer::new(crop.width, crop.height);
        for y in 0..crop.height {
            let src_y = (crop.y + y) as usize;
            if src_y >= desc.Height as usize {
                break;
            }
            for x in 0..crop.width {
                let src_x = (crop.x + x) as usize;
                if src_x >= desc.Width as usize {
                    break;
                }
                let offset = src_y * row_pitch + src_x * 4;
                let b = src_data[offset];
                let g = src_data[offset + 1];
                let r = src_data[offset + 2];
                img.put_pixel(x, y, Rgba([r, g, b, 255]));
            }
        }

        unsafe {
            self.context.Unmap(&staging_resource, 0);
        }

        Ok(img)
    }
}

/// Finds the monitor under the centre of `region` and its bounds in screen coordinates.
fn monitor_for(region: &Region) -> Result<(HMONITOR, RECT)> {
    let centre = POINT {
        x: region.x + (region.width / 2) as i32,
        y: region.y + (region.height / 2) as i32,
    };
    let monitor = unsafe { MonitorFromPoint(centre, MONITOR_DEFAULTTONEAREST) };
    if monitor.is_invalid() {
        return Err(anyhow!("No monitor found at ({}, {})", centre.x, centre.y));
    }

    let mut info = MONITORINFO {
        cbSize: std::mem::size_of::<MONITORINFO>() as u32,
        ..Default::default()
    };
    if !unsafe { GetMonitorInfoW(monitor, &mut info) }.as_bool() {
        return Err(anyhow!("GetMonitorInfoW failed"));
    }
    Ok((monitor, info.rcMonitor))
}

/// Intersects `region` with the monitor and converts to monitor-local pixels.
fn clip_to_monitor(region: &Region, monitor: &RECT) -> Result<Crop> {
    let left = region.x.max(monitor.left);
    let top = region.y.max(monitor.top);
    let right = (region.x + region.width as i32).min(monitor.right);
    let bottom = (region.y + region.height as i32).min(monitor.bottom);

    if right <= left || bottom <= top {
        return Err(anyhow!("Capture region {} is outside the monitor", region));
    }
    if (right - left) as u32 != region.width || (bottom - top) as u32 != region.height {
        crate::log(&format!(
            "Capture region {} extends past the monitor, clipping",
            region
        ));
    }

    Ok(Crop {
        x: (left - monitor.left) as u32,
        y: (top - monitor.top) as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

fn send_key(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> Result<()> {
    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: vk,
                dwFlags: flags,
                ..Default::default()
            },
        },
    };
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent != 1 {
        return Err(anyhow!(
            "SendInput delivered {} of 1 key events: {}",
            sent,
            windows::core::Error::from_win32()
        ));
    }
    Ok(())
}

/// Creates a Direct3D 11 device and immediate context.
fn create_d3d11_device() -> Result<(ID3D11Device, ID3D11DeviceContext)> {
    let mut device: Option<ID3D11Device> = None;
    let mut context: Option<ID3D11DeviceContext> = None;

    unsafe {
        D3D11CreateDevice(
            None,
            D3D_DRIVER_TYPE_HARDWARE,
            None,
            D3D11_CREATE_DEVICE_BGRA_SUPPORT,
            None,
            D3D11_SDK_VERSION,
            Some(&mut device),
            None,
            Some(&mut context),
        )?;
    }

    Ok((
        device.ok_or_else(|| anyhow!("Failed to create D3D11 device"))?,
        context.ok_or_else(|| anyhow!("Failed to create D3D11 context"))?,
    ))
}

/// Wraps the D3D11 device for the Graphics Capture API.
fn create_direct3d_device(device: &ID3D11Device) -> Result<IDirect3DDevice> {
    let dxgi_device: windows::Win32::Graphics::Dxgi::IDXGIDevice = device.cast()?;
    let inspectable = unsafe { CreateDirect3D11DeviceFromDXGIDevice(&dxgi_device)? };
    inspectable
        .cast()
        .context("Failed to cast to IDirect3DDevice")
}

fn create_capture_item(monitor: HMONITOR) -> Result<GraphicsCaptureItem> {
    let class_name = windows::core::h!("Windows.Graphics.Capture.GraphicsCaptureItem");
    let interop: IGraphicsCaptureItemInterop = unsafe {
        windows::Win32::System::WinRT::RoGetActivationFactory(class_name)
            .context("Failed to get IGraphicsCaptureItemInterop")?
    };
    unsafe {
        interop
            .CreateForMonitor(monitor)
            .context("Failed to create capture item for monitor")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(left: i32, top: i32, right: i32, bottom: i32) -> RECT {
        RECT {
            left,
            top,
            right,
            bottom,
        }
    }

    fn region(x: i32, y: i32, width: u32, height: u32) -> Region {
        Region {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_clip_region_inside_monitor() {
        let crop = clip_to_monitor(&region(100, 50, 300, 200), &monitor(0, 0, 1920, 1080)).unwrap();
        assert_eq!(
            crop,
            Crop {
                x: 100,
                y: 50,
                width: 300,
                height: 200
            }
        );
    }

    #[test]
    fn test_clip_region_partly_off_monitor() {
        let crop =
            clip_to_monitor(&region(1800, 1000, 300, 200), &monitor(0, 0, 1920, 1080)).unwrap();
        assert_eq!(
            crop,
            Crop {
                x: 1800,
                y: 1000,
                width: 120,
                height: 80
            }
        );
    }

    #[test]
    fn test_clip_uses_monitor_local_coordinates() {
        // Secondary monitor to the left of the primary one
        let crop =
            clip_to_monitor(&region(-1900, 10, 100, 100), &monitor(-1920, 0, 0, 1080)).unwrap();
        assert_eq!(
            crop,
            Crop {
                x: 20,
                y: 10,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn test_clip_region_off_monitor_fails() {
        let err = clip_to_monitor(&region(2000, 0, 100, 100), &monitor(0, 0, 1920, 1080))
            .unwrap_err();
        assert!(err.to_string().contains("outside the monitor"));
    }
}
